// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration sets and parameter binding.
//!
//! A component binds typed variables ([`ConfigParam`]) to parameter names.
//! Named configuration sets map parameter names to strings; activating a set
//! and calling [`ConfigAdmin::update`] parses the strings into the bound
//! variables.
//!
//! ```text
//! default      gain: 1.0        <- filled from bind defaults
//! fast         gain: 2.5
//! _internal    ...              <- hidden, cannot be activated or removed
//! ```

use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::str::FromStr;
use std::sync::Arc;

/// Name of the set holding the bound defaults.
pub const DEFAULT_SET: &str = "default";

/// Shared handle to a bound configuration variable.
///
/// The component keeps a clone and reads it from its callbacks.
#[derive(Debug)]
pub struct ConfigParam<T> {
    value: Arc<RwLock<T>>,
}

impl<T> Clone for ConfigParam<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Clone> ConfigParam<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
        }
    }

    /// Copy of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read()
    }

    fn set(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + Default> Default for ConfigParam<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Parse a comma separated list, e.g. `1.0, 2.0, 3.5`.
pub fn parse_seq<T: FromStr>(value: &str) -> Option<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

type Parser<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

trait BoundParam: Send + Sync {
    fn name(&self) -> &str;
    fn default_value(&self) -> &str;
    /// Parse and store; false leaves the variable untouched.
    fn update(&self, value: &str) -> bool;
}

struct Binding<T> {
    name: String,
    default_value: String,
    var: ConfigParam<T>,
    parser: Parser<T>,
}

impl<T: Clone + Send + Sync + 'static> BoundParam for Binding<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_value(&self) -> &str {
        &self.default_value
    }

    fn update(&self, value: &str) -> bool {
        match (self.parser)(value.trim()) {
            Some(v) => {
                self.var.set(v);
                true
            }
            None => {
                log::warn!(
                    "[ConfigAdmin] cannot parse '{}' for parameter {}",
                    value,
                    self.name
                );
                false
            }
        }
    }
}

/// Configuration event callbacks. All methods default to no-ops.
pub trait ConfigurationListener: Send + Sync {
    /// Bound variables refreshed from `set_id`.
    fn on_update(&self, _set_id: &str) {}
    /// One parameter refreshed.
    fn on_update_param(&self, _set_id: &str, _name: &str) {}
    /// Values of an existing set replaced.
    fn on_set(&self, _set: &Properties) {}
    fn on_add(&self, _set: &Properties) {}
    fn on_remove(&self, _set_id: &str) {}
    fn on_activate(&self, _set_id: &str) {}
}

struct AdminState {
    configsets: Properties,
    params: Vec<Box<dyn BoundParam>>,
    active_id: String,
    active: bool,
    changed: bool,
}

/// Holds configuration sets and applies them to bound variables.
pub struct ConfigAdmin {
    state: Mutex<AdminState>,
    listeners: ArcSwap<Vec<Arc<dyn ConfigurationListener>>>,
}

fn is_hidden(set_id: &str) -> bool {
    set_id.len() > 1 && set_id.starts_with('_')
}

impl Default for ConfigAdmin {
    fn default() -> Self {
        Self::new(Properties::new())
    }
}

impl ConfigAdmin {
    /// `configsets` holds one child node per set (the `conf` node of a
    /// component's properties).
    pub fn new(configsets: Properties) -> Self {
        let mut configsets = configsets;
        configsets.get_node(DEFAULT_SET);
        Self {
            state: Mutex::new(AdminState {
                configsets,
                params: Vec::new(),
                active_id: DEFAULT_SET.to_string(),
                active: false,
                changed: false,
            }),
            listeners: ArcSwap::default(),
        }
    }

    /// Bind `var` to `name`, parsing values with [`FromStr`].
    pub fn bind_parameter<T>(
        &self,
        name: &str,
        var: &ConfigParam<T>,
        default_value: &str,
    ) -> RtcResult<()>
    where
        T: FromStr + Clone + Send + Sync + 'static,
    {
        self.bind_parameter_with(name, var, default_value, |s| s.parse().ok())
    }

    /// Bind `var` to `name` with a custom parser.
    ///
    /// The default must parse; it is applied to `var` and recorded in the
    /// `default` set unless that set already has a value for `name`.
    pub fn bind_parameter_with<T, F>(
        &self,
        name: &str,
        var: &ConfigParam<T>,
        default_value: &str,
        parser: F,
    ) -> RtcResult<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        if name.is_empty() || default_value.is_empty() {
            return Err(RtcError::bad_param("parameter name and default must be set"));
        }
        let mut state = self.state.lock();
        if state.params.iter().any(|p| p.name() == name) {
            return Err(RtcError::bad_param(format!("parameter {} already bound", name)));
        }
        let binding = Binding {
            name: name.to_string(),
            default_value: default_value.to_string(),
            var: var.clone(),
            parser: Box::new(parser),
        };
        if !binding.update(default_value) {
            return Err(RtcError::bad_param(format!(
                "default '{}' of {} does not parse",
                default_value, name
            )));
        }
        let defaults = state.configsets.get_node(DEFAULT_SET);
        if !defaults.has_key(name) {
            defaults.set_property(name, default_value);
        }
        state.params.push(Box::new(binding));
        log::debug!("[ConfigAdmin::bind_parameter] {} = {}", name, default_value);
        Ok(())
    }

    pub fn is_exist(&self, name: &str) -> bool {
        self.state.lock().params.iter().any(|p| p.name() == name)
    }

    /// Names of bound parameters with their defaults.
    pub fn parameters(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .params
            .iter()
            .map(|p| (p.name().to_string(), p.default_value().to_string()))
            .collect()
    }

    /// Apply the active set if it changed since the last update.
    ///
    /// Checking, applying and clearing the change flag happen under one lock,
    /// so an activation racing with the update is kept for the next one.
    pub fn update(&self) {
        let set_id = {
            let mut state = self.state.lock();
            if !(state.changed && state.active) {
                return;
            }
            let set_id = state.active_id.clone();
            if !Self::apply_locked(&state, &set_id) {
                return;
            }
            state.changed = false;
            set_id
        };
        log::debug!("[ConfigAdmin::update] applied {}", set_id);
        self.each_listener(|l| l.on_update(&set_id));
    }

    /// Apply `set_id` without changing the active set.
    pub fn update_set(&self, set_id: &str) {
        self.apply_set(set_id);
    }

    /// Apply one parameter from `set_id`.
    pub fn update_param(&self, set_id: &str, name: &str) {
        let applied = {
            let state = self.state.lock();
            let Some(set) = state.configsets.find_node(set_id) else {
                return;
            };
            if !set.has_key(name) {
                return;
            }
            let value = set.get_property(name).to_string();
            state
                .params
                .iter()
                .find(|p| p.name() == name)
                .map(|p| p.update(&value))
                .unwrap_or(false)
        };
        if applied {
            self.each_listener(|l| l.on_update_param(set_id, name));
        }
    }

    fn apply_locked(state: &AdminState, set_id: &str) -> bool {
        let Some(set) = state.configsets.find_node(set_id) else {
            return false;
        };
        for param in &state.params {
            if set.has_key(param.name()) {
                param.update(set.get_property(param.name()));
            }
        }
        true
    }

    fn apply_set(&self, set_id: &str) -> bool {
        if !Self::apply_locked(&self.state.lock(), set_id) {
            return false;
        }
        log::debug!("[ConfigAdmin::update_set] applied {}", set_id);
        self.each_listener(|l| l.on_update(set_id));
        true
    }

    pub fn is_changed(&self) -> bool {
        self.state.lock().changed
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn active_id(&self) -> String {
        self.state.lock().active_id.clone()
    }

    pub fn have_config(&self, set_id: &str) -> bool {
        self.state.lock().configsets.find_node(set_id).is_some()
    }

    /// All sets, including hidden ones.
    pub fn get_configuration_sets(&self) -> Vec<Properties> {
        self.state.lock().configsets.leaves().to_vec()
    }

    pub fn get_configuration_set(&self, set_id: &str) -> RtcResult<Properties> {
        self.state
            .lock()
            .configsets
            .find_node(set_id)
            .cloned()
            .ok_or_else(|| RtcError::bad_param(format!("no configuration set {}", set_id)))
    }

    pub fn get_active_configuration_set(&self) -> RtcResult<Properties> {
        let state = self.state.lock();
        state
            .configsets
            .find_node(&state.active_id)
            .cloned()
            .ok_or_else(|| RtcError::bad_param(format!("no configuration set {}", state.active_id)))
    }

    /// Merge `set` (named by its node name) into an existing set.
    pub fn set_configuration_set_values(&self, set: &Properties) -> RtcResult<()> {
        {
            let mut state = self.state.lock();
            let set_id = set.name();
            if set_id.is_empty() {
                return Err(RtcError::bad_param("configuration set has no name"));
            }
            let node = state
                .configsets
                .find_node_mut(set_id)
                .ok_or_else(|| RtcError::bad_param(format!("no configuration set {}", set_id)))?;
            node.merge(set);
            state.changed = true;
        }
        self.each_listener(|l| l.on_set(set));
        Ok(())
    }

    /// Add a new set. The admin becomes inactive until the next activation.
    pub fn add_configuration_set(&self, set: &Properties) -> RtcResult<()> {
        {
            let mut state = self.state.lock();
            let set_id = set.name();
            if set_id.is_empty() || set_id.contains('.') {
                return Err(RtcError::bad_param(format!("invalid set name '{}'", set_id)));
            }
            if state.configsets.find_node(set_id).is_some() {
                return Err(RtcError::bad_param(format!("configuration set {} exists", set_id)));
            }
            state.configsets.get_node(set_id).merge(set);
            state.changed = true;
            state.active = false;
        }
        self.each_listener(|l| l.on_add(set));
        Ok(())
    }

    /// Remove a set. `default`, hidden sets and the active set are refused.
    pub fn remove_configuration_set(&self, set_id: &str) -> RtcResult<()> {
        {
            let mut state = self.state.lock();
            if set_id == DEFAULT_SET || is_hidden(set_id) {
                return Err(RtcError::bad_param(format!("set {} is reserved", set_id)));
            }
            if state.active_id == set_id {
                return Err(RtcError::bad_param(format!("set {} is active", set_id)));
            }
            if state.configsets.remove_node(set_id).is_none() {
                return Err(RtcError::bad_param(format!("no configuration set {}", set_id)));
            }
            state.changed = true;
        }
        self.each_listener(|l| l.on_remove(set_id));
        Ok(())
    }

    /// Make `set_id` active; the next [`update`](Self::update) applies it.
    pub fn activate_configuration_set(&self, set_id: &str) -> RtcResult<()> {
        {
            let mut state = self.state.lock();
            if set_id.is_empty() || is_hidden(set_id) {
                return Err(RtcError::bad_param(format!("set '{}' cannot be activated", set_id)));
            }
            if state.configsets.find_node(set_id).is_none() {
                return Err(RtcError::bad_param(format!("no configuration set {}", set_id)));
            }
            state.active_id = set_id.to_string();
            state.active = true;
            state.changed = true;
        }
        log::debug!("[ConfigAdmin::activate_configuration_set] {}", set_id);
        self.each_listener(|l| l.on_activate(set_id));
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners.rcu(|cur| {
            let mut next = Vec::clone(cur);
            next.push(listener.clone());
            next
        });
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigurationListener>) -> bool {
        let before = self.listeners.load().len();
        self.listeners.rcu(|cur| {
            cur.iter()
                .filter(|l| !Arc::ptr_eq(l, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
        self.listeners.load().len() != before
    }

    fn each_listener<F: Fn(&dyn ConfigurationListener)>(&self, f: F) {
        for l in self.listeners.load().iter() {
            f(l.as_ref());
        }
    }
}
