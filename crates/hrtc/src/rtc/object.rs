// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The component object: profile, ports, configuration, contexts.

use super::{
    ComponentBehavior, ComponentProfile, ExecContextHandle, LifeCycleState, NoBehavior,
    ECOTHER_OFFSET,
};
use crate::broker::{ObjectBroker, ObjectId};
use crate::config_admin::{ConfigAdmin, ConfigParam, DEFAULT_SET};
use crate::ec::ExecutionContext;
use crate::error::{RtcError, RtcResult};
use crate::port::PortService;
use crate::properties::Properties;
use crate::sdo::SdoConfiguration;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// An RT-Component instance.
///
/// Created by a factory, which installs the user's [`ComponentBehavior`].
/// Callbacks are serialized: at most one runs at a time, whichever context
/// drives it.
pub struct RtObject {
    id: ObjectId,
    this: Weak<RtObject>,
    properties: RwLock<Properties>,
    broker: Arc<ObjectBroker>,
    behavior: Mutex<Box<dyn ComponentBehavior>>,
    ports: RwLock<Vec<Arc<dyn PortService>>>,
    config: ConfigAdmin,
    sdo: SdoConfiguration,
    owned: RwLock<Vec<Arc<dyn ExecutionContext>>>,
    participating: RwLock<Vec<Option<Arc<dyn ExecutionContext>>>>,
    created: AtomicBool,
    exiting: AtomicBool,
    finalized: AtomicBool,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl RtObject {
    /// `properties` is the component profile (`type_name`, `instance_name`,
    /// `conf.<set>.<param>`, ...).
    pub fn new(broker: Arc<ObjectBroker>, properties: Properties) -> Arc<Self> {
        let configsets = properties.find_node("conf").cloned().unwrap_or_default();
        Arc::new_cyclic(|this| Self {
            id: ObjectId::next(),
            this: this.clone(),
            properties: RwLock::new(properties),
            broker,
            behavior: Mutex::new(Box::new(NoBehavior)),
            ports: RwLock::new(Vec::new()),
            config: ConfigAdmin::new(configsets),
            sdo: SdoConfiguration::new(),
            owned: RwLock::new(Vec::new()),
            participating: RwLock::new(Vec::new()),
            created: AtomicBool::new(true),
            exiting: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn instance_name(&self) -> String {
        self.properties.read().get_property("instance_name").to_string()
    }

    pub fn type_name(&self) -> String {
        self.properties.read().get_property("type_name").to_string()
    }

    pub fn category(&self) -> String {
        self.properties.read().get_property("category").to_string()
    }

    /// Rename the instance; attached ports follow.
    pub fn set_instance_name(&self, name: &str) {
        self.properties.write().set_property("instance_name", name);
        for port in self.ports.read().iter() {
            port.attach(name, self.broker.clone());
        }
    }

    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }

    /// Merge `props` into the profile and seed configuration sets from its
    /// `conf` node.
    pub fn apply_properties(&self, props: &Properties) {
        self.properties.write().merge(props);
        let Some(conf) = props.find_node("conf") else {
            return;
        };
        for set in conf.leaves() {
            let res = if self.config.have_config(set.name()) {
                self.config.set_configuration_set_values(set)
            } else {
                self.config.add_configuration_set(set)
            };
            if let Err(e) = res {
                log::warn!("[RtObject::apply_properties] set {}: {}", set.name(), e);
            }
        }
    }

    pub fn broker(&self) -> &Arc<ObjectBroker> {
        &self.broker
    }

    pub fn set_behavior(&self, behavior: Box<dyn ComponentBehavior>) {
        *self.behavior.lock() = behavior;
    }

    pub fn is_created(&self) -> bool {
        self.created.load(Ordering::Acquire)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    // --- ports -----------------------------------------------------------

    /// Register a port. Names are unique per component.
    pub fn add_port(&self, port: Arc<dyn PortService>) -> RtcResult<()> {
        let mut ports = self.ports.write();
        let name = port.name();
        let short = name.rsplit('.').next().unwrap_or(&name);
        if ports.iter().any(|p| Self::port_matches(p.as_ref(), short)) {
            return Err(RtcError::bad_param(format!(
                "port {} already exists on {}",
                short,
                self.instance_name()
            )));
        }
        port.attach(&self.instance_name(), self.broker.clone());
        log::debug!("[RtObject::add_port] {}", port.name());
        ports.push(port);
        Ok(())
    }

    /// Disconnect and remove a port by short or full name.
    pub fn remove_port(&self, name: &str) -> RtcResult<()> {
        let port = {
            let mut ports = self.ports.write();
            let idx = ports
                .iter()
                .position(|p| Self::port_matches(p.as_ref(), name))
                .ok_or_else(|| RtcError::bad_param(format!("no port {}", name)))?;
            ports.remove(idx)
        };
        port.shutdown();
        Ok(())
    }

    fn port_matches(port: &dyn PortService, name: &str) -> bool {
        let full = port.name();
        full == name || full.rsplit('.').next() == Some(name)
    }

    pub fn get_ports(&self) -> Vec<Arc<dyn PortService>> {
        self.ports.read().clone()
    }

    pub fn get_port(&self, name: &str) -> Option<Arc<dyn PortService>> {
        self.ports
            .read()
            .iter()
            .find(|p| Self::port_matches(p.as_ref(), name))
            .cloned()
    }

    fn activate_ports(&self) {
        for port in self.ports.read().iter() {
            port.activate_interfaces();
        }
    }

    fn deactivate_ports(&self) {
        for port in self.ports.read().iter() {
            port.deactivate_interfaces();
        }
    }

    fn shutdown_ports(&self) {
        let ports = std::mem::take(&mut *self.ports.write());
        for port in ports {
            port.shutdown();
        }
    }

    // --- configuration -----------------------------------------------------

    pub fn config(&self) -> &ConfigAdmin {
        &self.config
    }

    pub fn bind_parameter<T>(
        &self,
        name: &str,
        var: &ConfigParam<T>,
        default_value: &str,
    ) -> RtcResult<()>
    where
        T: FromStr + Clone + Send + Sync + 'static,
    {
        self.config.bind_parameter(name, var, default_value)
    }

    pub fn sdo(&self) -> &SdoConfiguration {
        &self.sdo
    }

    pub fn get_component_profile(&self) -> ComponentProfile {
        let props = self.properties();
        ComponentProfile {
            instance_name: props.get_property("instance_name").to_string(),
            type_name: props.get_property("type_name").to_string(),
            description: props.get_property("description").to_string(),
            version: props.get_property("version").to_string(),
            vendor: props.get_property("vendor").to_string(),
            category: props.get_property("category").to_string(),
            port_profiles: self
                .ports
                .read()
                .iter()
                .map(|p| p.get_port_profile())
                .collect(),
            organizations: self.sdo.get_organizations().into_iter().map(|o| o.id).collect(),
            properties: props,
        }
    }

    // --- lifecycle ---------------------------------------------------------

    /// Run `on_initialize` and apply the initial configuration set.
    pub fn initialize(&self) -> RtcResult<()> {
        if !self.is_created() {
            return Err(RtcError::precondition(format!(
                "{} already initialized",
                self.instance_name()
            )));
        }
        self.invoke("on_initialize", |b| b.on_initialize())?;

        let wanted = self
            .properties
            .read()
            .get_property_or("configuration.active_config", DEFAULT_SET);
        let active = if self.config.have_config(&wanted) {
            wanted
        } else {
            DEFAULT_SET.to_string()
        };
        if let Err(e) = self.config.activate_configuration_set(&active) {
            log::warn!("[RtObject::initialize] {}", e);
        }
        self.config.update();

        self.created.store(false, Ordering::Release);
        log::debug!("[RtObject::initialize] {} initialized", self.instance_name());
        Ok(())
    }

    /// Run `on_finalize` and release the ports. Only valid once [`exit`]
    /// has started; refused while an owned context still has the component
    /// Active or it still participates in foreign contexts.
    ///
    /// [`exit`]: Self::exit
    pub fn finalize(&self) -> RtcResult<()> {
        if self.is_created() {
            return Err(RtcError::precondition("component not initialized"));
        }
        if !self.exiting.load(Ordering::Acquire) {
            return Err(RtcError::precondition(format!(
                "{} is not exiting",
                self.instance_name()
            )));
        }
        let active = self
            .owned
            .read()
            .iter()
            .any(|ec| ec.get_component_state(self) == LifeCycleState::Active);
        if active {
            return Err(RtcError::precondition(format!(
                "{} still active in an owned context",
                self.instance_name()
            )));
        }
        if self.participating.read().iter().any(Option::is_some) {
            return Err(RtcError::precondition(format!(
                "{} still participates in execution contexts",
                self.instance_name()
            )));
        }
        let ret = self.invoke("on_finalize", |b| b.on_finalize());
        self.shutdown_ports();
        self.owned.write().clear();
        self.finalized.store(true, Ordering::Release);
        log::debug!("[RtObject::finalize] {} finalized", self.instance_name());
        ret
    }

    /// Leave every context, stop the owned ones, then finalize.
    pub fn exit(&self) -> RtcResult<()> {
        if self.is_created() {
            return Err(RtcError::precondition("component not initialized"));
        }
        if self.exiting.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let owned = self.get_owned_contexts();
        let others = self.get_participating_contexts();

        for ec in owned.iter().chain(others.iter()) {
            if let Err(e) = ec.deactivate_component(self) {
                log::trace!("[RtObject::exit] deactivate: {}", e);
            }
        }
        for ec in &owned {
            if ec.is_running() {
                if let Err(e) = ec.stop() {
                    log::debug!("[RtObject::exit] stop: {}", e);
                }
            }
            if let Err(e) = ec.remove_component(self) {
                log::debug!("[RtObject::exit] remove from owned: {}", e);
            }
        }
        for ec in &others {
            if let Err(e) = ec.remove_component(self) {
                log::debug!("[RtObject::exit] remove: {}", e);
            }
        }
        self.participating.write().clear();
        self.finalize()
    }

    /// True when the component is alive and attached to `ec`.
    pub fn is_alive(&self, ec: &dyn ExecutionContext) -> bool {
        if self.is_finalized() {
            return false;
        }
        let id = ec.id();
        self.owned.read().iter().any(|e| e.id() == id)
            || self
                .participating
                .read()
                .iter()
                .flatten()
                .any(|e| e.id() == id)
    }

    // --- contexts ----------------------------------------------------------

    /// Record `ec` as an owned context.
    pub fn bind_context(&self, ec: Arc<dyn ExecutionContext>) -> RtcResult<ExecContextHandle> {
        if self.is_finalized() {
            return Err(RtcError::precondition("component finalized"));
        }
        let mut owned = self.owned.write();
        if let Some(idx) = owned.iter().position(|e| e.id() == ec.id()) {
            return Ok(idx as ExecContextHandle);
        }
        owned.push(ec);
        Ok((owned.len() - 1) as ExecContextHandle)
    }

    /// Record `ec` as a participating context.
    pub fn attach_context(&self, ec: Arc<dyn ExecutionContext>) -> RtcResult<ExecContextHandle> {
        if self.is_finalized() {
            return Err(RtcError::precondition("component finalized"));
        }
        let mut slots = self.participating.write();
        if slots.iter().flatten().any(|e| e.id() == ec.id()) {
            return Err(RtcError::bad_param("context already attached"));
        }
        let idx = match slots.iter().position(Option::is_none) {
            Some(idx) => {
                slots[idx] = Some(ec);
                idx
            }
            None => {
                slots.push(Some(ec));
                slots.len() - 1
            }
        };
        Ok(ECOTHER_OFFSET + idx as ExecContextHandle)
    }

    /// Forget a participating context. Owned contexts cannot be detached.
    pub fn detach_context(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        if ec_id < ECOTHER_OFFSET {
            return Err(RtcError::bad_param(format!("context {} is owned", ec_id)));
        }
        let idx = (ec_id - ECOTHER_OFFSET) as usize;
        self.participating
            .write()
            .get_mut(idx)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or_else(|| RtcError::bad_param(format!("no context {}", ec_id)))
    }

    pub fn get_context(&self, ec_id: ExecContextHandle) -> Option<Arc<dyn ExecutionContext>> {
        if ec_id < ECOTHER_OFFSET {
            self.owned.read().get(ec_id as usize).cloned()
        } else {
            self.participating
                .read()
                .get((ec_id - ECOTHER_OFFSET) as usize)
                .cloned()
                .flatten()
        }
    }

    pub fn get_context_handle(&self, ec: &dyn ExecutionContext) -> Option<ExecContextHandle> {
        let id = ec.id();
        if let Some(idx) = self.owned.read().iter().position(|e| e.id() == id) {
            return Some(idx as ExecContextHandle);
        }
        self.participating
            .read()
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.id() == id))
            .map(|idx| ECOTHER_OFFSET + idx as ExecContextHandle)
    }

    pub fn get_owned_contexts(&self) -> Vec<Arc<dyn ExecutionContext>> {
        self.owned.read().clone()
    }

    pub fn get_participating_contexts(&self) -> Vec<Arc<dyn ExecutionContext>> {
        self.participating.read().iter().flatten().cloned().collect()
    }

    /// Strong handle to this component.
    pub fn handle(&self) -> Option<Arc<RtObject>> {
        self.this.upgrade()
    }

    // --- callbacks (driven by execution contexts) ---------------------------

    fn invoke<F>(&self, what: &str, f: F) -> RtcResult<()>
    where
        F: FnOnce(&mut dyn ComponentBehavior) -> RtcResult<()>,
    {
        let mut behavior = self.behavior.lock();
        match catch_unwind(AssertUnwindSafe(|| f(&mut **behavior))) {
            Ok(ret) => ret,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!(
                    "[RtObject::{}] {} panicked: {}",
                    what,
                    self.instance_name(),
                    msg
                );
                Err(RtcError::Internal(format!("{} panicked: {}", what, msg)))
            }
        }
    }

    pub fn on_startup(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_startup", |b| b.on_startup(ec_id))
    }

    pub fn on_shutdown(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_shutdown", |b| b.on_shutdown(ec_id))
    }

    pub fn on_activated(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.config.update();
        let ret = self.invoke("on_activated", |b| b.on_activated(ec_id));
        self.activate_ports();
        ret
    }

    pub fn on_deactivated(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.deactivate_ports();
        self.invoke("on_deactivated", |b| b.on_deactivated(ec_id))
    }

    pub fn on_aborting(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.deactivate_ports();
        self.invoke("on_aborting", |b| b.on_aborting(ec_id))
    }

    pub fn on_error(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_error", |b| b.on_error(ec_id))
    }

    pub fn on_reset(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_reset", |b| b.on_reset(ec_id))
    }

    pub fn on_execute(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_execute", |b| b.on_execute(ec_id))
    }

    pub fn on_state_update(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        let ret = self.invoke("on_state_update", |b| b.on_state_update(ec_id));
        self.config.update();
        ret
    }

    pub fn on_rate_changed(&self, ec_id: ExecContextHandle) -> RtcResult<()> {
        self.invoke("on_rate_changed", |b| b.on_rate_changed(ec_id))
    }
}
