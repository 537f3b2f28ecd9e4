// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Module loading against a table of statically linked modules.
//!
//! A module is known by its stem (`Echo` for `Echo.so`, `./lib/Echo`, ...)
//! and exports named init functions. `load` resolves the module, picks the
//! init function (default `<prefix><stem><suffix>`, e.g. `EchoInit`) and
//! hands it back to the manager, which runs it.

use super::Manager;
use crate::error::{RtcError, RtcResult};
use crate::properties::{split_csv, to_bool, Properties};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Module entry point: registers factories with the manager.
pub type ModuleInitFn = Arc<dyn Fn(&Manager) -> RtcResult<()> + Send + Sync>;

/// A module that has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub name: String,
    /// Path found on `manager.modules.load_path`, or the requested name.
    pub file_path: String,
    pub init_func: String,
}

pub struct ModuleManager {
    load_path: Vec<String>,
    abs_path_allowed: bool,
    init_prefix: String,
    init_suffix: String,
    registry: RwLock<BTreeMap<String, BTreeMap<String, ModuleInitFn>>>,
    loaded: RwLock<Vec<LoadedModule>>,
}

fn module_stem(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

impl ModuleManager {
    /// Settings come from `manager.modules.*`.
    pub fn new(props: &Properties) -> Self {
        Self {
            load_path: split_csv(props.get_property("manager.modules.load_path")),
            abs_path_allowed: to_bool(props.get_property("manager.modules.abs_path_allowed"), true),
            init_prefix: props.get_property("manager.modules.init_func_prefix").to_string(),
            init_suffix: props.get_property("manager.modules.init_func_suffix").to_string(),
            registry: RwLock::new(BTreeMap::new()),
            loaded: RwLock::new(Vec::new()),
        }
    }

    /// Make `init` available as `init_func` of module `name`.
    pub fn register_module(
        &self,
        name: &str,
        init_func: &str,
        init: ModuleInitFn,
    ) -> RtcResult<()> {
        if name.is_empty() || init_func.is_empty() {
            return Err(RtcError::bad_param("module and init function names must not be empty"));
        }
        self.registry
            .write()
            .entry(name.to_string())
            .or_default()
            .insert(init_func.to_string(), init);
        log::debug!("[ModuleManager::register_module] {}::{}", name, init_func);
        Ok(())
    }

    /// Default init function name for a module stem.
    pub fn init_func_name(&self, stem: &str) -> String {
        format!("{}{}{}", self.init_prefix, stem, self.init_suffix)
    }

    /// Resolve `file_name` and its init function.
    ///
    /// Returns `None` as the init function when the module was already
    /// loaded.
    pub fn load(
        &self,
        file_name: &str,
        init_func: &str,
    ) -> RtcResult<(LoadedModule, Option<ModuleInitFn>)> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(RtcError::bad_param("empty module name"));
        }
        let path = Path::new(file_name);
        if path.is_absolute() && !self.abs_path_allowed {
            return Err(RtcError::precondition(format!(
                "absolute module path {} not allowed",
                file_name
            )));
        }
        let stem = module_stem(file_name)
            .ok_or_else(|| RtcError::bad_param(format!("invalid module name {}", file_name)))?;

        if let Some(m) = self.loaded.read().iter().find(|m| m.name == stem) {
            log::debug!("[ModuleManager::load] {} already loaded", stem);
            return Ok((m.clone(), None));
        }

        let init_func = if init_func.is_empty() {
            self.init_func_name(&stem)
        } else {
            init_func.to_string()
        };
        let init = {
            let registry = self.registry.read();
            let symbols = registry
                .get(&stem)
                .ok_or_else(|| RtcError::NotFound(format!("module {}", stem)))?;
            symbols
                .get(&init_func)
                .cloned()
                .ok_or_else(|| RtcError::NotFound(format!("{} in module {}", init_func, stem)))?
        };

        let module = LoadedModule {
            name: stem,
            file_path: self.find_file(file_name),
            init_func,
        };
        self.loaded.write().push(module.clone());
        log::debug!("[ModuleManager::load] {} ({})", module.name, module.file_path);
        Ok((module, Some(init)))
    }

    fn find_file(&self, file_name: &str) -> String {
        let path = Path::new(file_name);
        if path.is_absolute() {
            return file_name.to_string();
        }
        self.load_path
            .iter()
            .map(|dir| Path::new(dir).join(path))
            .find(|p| p.is_file())
            .map_or_else(|| file_name.to_string(), |p| p.to_string_lossy().into_owned())
    }

    pub fn unload(&self, name: &str) -> RtcResult<()> {
        let stem = module_stem(name).unwrap_or_else(|| name.to_string());
        let mut loaded = self.loaded.write();
        let before = loaded.len();
        loaded.retain(|m| m.name != stem && m.file_path != name);
        if loaded.len() == before {
            return Err(RtcError::NotFound(format!("module {} not loaded", name)));
        }
        log::debug!("[ModuleManager::unload] {}", name);
        Ok(())
    }

    pub fn unload_all(&self) {
        self.loaded.write().clear();
    }

    pub fn get_loaded_modules(&self) -> Vec<LoadedModule> {
        self.loaded.read().clone()
    }

    /// Registered module names.
    pub fn get_loadable_modules(&self) -> Vec<String> {
        self.registry.read().keys().cloned().collect()
    }
}
