// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Naming: directory services components are bound into.
//!
//! `naming.type` lists the services (only `local` is built in),
//! `naming.formats` the names each component is bound under.

use crate::error::{RtcError, RtcResult};
use crate::properties::{split_csv, Properties};
use crate::rtc::RtObject;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// A directory of component references.
pub trait NamingBase: Send + Sync {
    /// Service type as it appears in `naming.type`.
    fn kind(&self) -> &str;

    fn bind_object(&self, name: &str, comp: &Arc<RtObject>) -> RtcResult<()>;

    fn unbind_object(&self, name: &str) -> RtcResult<()>;

    fn resolve(&self, name: &str) -> Option<Arc<RtObject>>;

    fn is_alive(&self) -> bool {
        true
    }
}

/// In-process directory.
#[derive(Default)]
pub struct LocalNaming {
    names: RwLock<BTreeMap<String, Weak<RtObject>>>,
}

impl LocalNaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.names.read().keys().cloned().collect()
    }
}

impl NamingBase for LocalNaming {
    fn kind(&self) -> &str {
        "local"
    }

    fn bind_object(&self, name: &str, comp: &Arc<RtObject>) -> RtcResult<()> {
        if name.is_empty() {
            return Err(RtcError::bad_param("empty name"));
        }
        self.names
            .write()
            .insert(name.to_string(), Arc::downgrade(comp));
        Ok(())
    }

    fn unbind_object(&self, name: &str) -> RtcResult<()> {
        self.names
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RtcError::NotFound(format!("name {}", name)))
    }

    fn resolve(&self, name: &str) -> Option<Arc<RtObject>> {
        self.names.read().get(name).and_then(Weak::upgrade)
    }
}

/// Expand a naming format for a component.
///
/// `%n` instance name, `%t`/`%m` type name, `%v` version, `%V` vendor,
/// `%c` category, `%h` host name, `%M` manager name, `%p` pid, `%%` a
/// literal percent. Unknown sequences are kept verbatim.
pub fn format_name(format: &str, comp: &Properties, manager: &Properties) -> String {
    let mut out = String::with_capacity(format.len() + 16);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(comp.get_property("instance_name")),
            Some('t') | Some('m') => out.push_str(comp.get_property("type_name")),
            Some('v') => out.push_str(comp.get_property("version")),
            Some('V') => out.push_str(comp.get_property("vendor")),
            Some('c') => out.push_str(comp.get_property("category")),
            Some('h') => out.push_str(manager.get_property("manager.os.hostname")),
            Some('M') => out.push_str(manager.get_property("manager.name")),
            Some('p') => out.push_str(manager.get_property("manager.pid")),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

struct Binding {
    name: String,
    comp: Weak<RtObject>,
}

/// Binds components into every configured naming service.
pub struct NamingManager {
    manager_props: Properties,
    services: RwLock<Vec<Arc<dyn NamingBase>>>,
    bindings: Mutex<Vec<Binding>>,
}

impl NamingManager {
    pub fn new(manager_props: Properties) -> Self {
        Self {
            manager_props,
            services: RwLock::new(Vec::new()),
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// Register the services named in `naming.type`. Unknown types are
    /// skipped.
    pub fn init_services(&self) {
        for kind in split_csv(self.manager_props.get_property("naming.type")) {
            match kind.as_str() {
                "local" => self.register_service(Arc::new(LocalNaming::new())),
                other => log::warn!("[NamingManager] unsupported naming type '{}'", other),
            }
        }
    }

    pub fn register_service(&self, service: Arc<dyn NamingBase>) {
        log::debug!("[NamingManager::register_service] {}", service.kind());
        self.services.write().push(service);
    }

    pub fn services(&self) -> Vec<Arc<dyn NamingBase>> {
        self.services.read().clone()
    }

    /// Bind `comp` under every name in `naming.formats`; returns the names.
    pub fn bind_component(&self, comp: &Arc<RtObject>) -> Vec<String> {
        let props = comp.properties();
        let names: Vec<String> = split_csv(self.manager_props.get_property("naming.formats"))
            .iter()
            .map(|f| format_name(f, &props, &self.manager_props))
            .collect();
        for name in &names {
            self.bind_object(name, comp);
        }
        names
    }

    pub fn bind_object(&self, name: &str, comp: &Arc<RtObject>) {
        for svc in self.services.read().iter() {
            if let Err(e) = svc.bind_object(name, comp) {
                log::warn!("[NamingManager::bind_object] {} in {}: {}", name, svc.kind(), e);
            }
        }
        let mut bindings = self.bindings.lock();
        bindings.retain(|b| b.name != name);
        bindings.push(Binding {
            name: name.to_string(),
            comp: Arc::downgrade(comp),
        });
        log::debug!("[NamingManager::bind_object] {}", name);
    }

    pub fn unbind_object(&self, name: &str) {
        for svc in self.services.read().iter() {
            if let Err(e) = svc.unbind_object(name) {
                log::debug!("[NamingManager::unbind_object] {} in {}: {}", name, svc.kind(), e);
            }
        }
        self.bindings.lock().retain(|b| b.name != name);
    }

    /// Unbind every name bound for `comp`.
    pub fn unbind_component(&self, comp: &RtObject) {
        let names: Vec<String> = self
            .bindings
            .lock()
            .iter()
            .filter(|b| b.comp.upgrade().is_some_and(|c| c.id() == comp.id()))
            .map(|b| b.name.clone())
            .collect();
        for name in names {
            self.unbind_object(&name);
        }
    }

    pub fn unbind_all(&self) {
        let names: Vec<String> = self.bindings.lock().iter().map(|b| b.name.clone()).collect();
        for name in names {
            self.unbind_object(&name);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<RtObject>> {
        self.services.read().iter().find_map(|svc| svc.resolve(name))
    }

    /// Names currently recorded as bound.
    pub fn bound_names(&self) -> Vec<String> {
        self.bindings.lock().iter().map(|b| b.name.clone()).collect()
    }

    /// Rebind recorded names a live service has lost; drop names whose
    /// component is gone.
    pub fn update(&self) {
        let live: Vec<(String, Arc<RtObject>)> = {
            let mut bindings = self.bindings.lock();
            bindings.retain(|b| b.comp.strong_count() > 0);
            bindings
                .iter()
                .filter_map(|b| b.comp.upgrade().map(|c| (b.name.clone(), c)))
                .collect()
        };
        for svc in self.services.read().iter() {
            if !svc.is_alive() {
                continue;
            }
            for (name, comp) in &live {
                if svc.resolve(name).is_none() {
                    log::debug!("[NamingManager::update] rebinding {} in {}", name, svc.kind());
                    if let Err(e) = svc.bind_object(name, comp) {
                        log::warn!("[NamingManager::update] {}: {}", name, e);
                    }
                }
            }
        }
    }
}
