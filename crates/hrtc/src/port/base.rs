// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Port state and the multi-phase connection handshake.
//!
//! Concrete ports embed a [`PortBase`] and implement the [`Port`] hooks. The
//! blanket [`PortService`] implementation below drives the handshake:
//!
//! ```text
//! connect(profile)                         (master)
//!   └─ ports[0].notify_connect(profile)
//!        ├─ publish_interfaces(profile)    add own endpoint keys
//!        ├─ ports[i+1].notify_connect      recurse down the chain
//!        ├─ subscribe_interfaces(profile)  build connectors from peer keys
//!        └─ record profile, fire on_connected
//! ```
//!
//! Every phase runs even if an earlier one failed; the first error is
//! returned and the master undoes the partial connection through
//! `notify_disconnect`. Locks are held only around profile list updates,
//! never across calls into other ports.

use super::listener::{PortConnectListener, PortConnectListeners};
use super::{
    ConnectorProfile, PortInterfacePolarity, PortInterfaceProfile, PortProfile, PortRef,
    PortService,
};
use crate::broker::{ObjectBroker, ObjectId};
use crate::error::{ReturnCode, RtcError, RtcResult};
use crate::properties::Properties;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

#[derive(Default)]
struct PortState {
    interfaces: Vec<PortInterfaceProfile>,
    connector_profiles: Vec<ConnectorProfile>,
    properties: Properties,
}

/// State shared by every port type.
pub struct PortBase {
    self_ref: PortRef,
    name: String,
    owner: RwLock<String>,
    state: Mutex<PortState>,
    broker: RwLock<Option<Arc<ObjectBroker>>>,
    listeners: PortConnectListeners,
    active: AtomicBool,
}

impl PortBase {
    /// `this` is the weak self-reference obtained from `Arc::new_cyclic`.
    pub fn new(name: &str, this: Weak<dyn PortService>) -> Self {
        Self {
            self_ref: PortRef::new(ObjectId::next(), this),
            name: name.to_string(),
            owner: RwLock::new(String::new()),
            state: Mutex::new(PortState::default()),
            broker: RwLock::new(None),
            listeners: PortConnectListeners::default(),
            active: AtomicBool::new(false),
        }
    }

    pub fn port_ref(&self) -> PortRef {
        self.self_ref.clone()
    }

    pub fn id(&self) -> ObjectId {
        self.self_ref.id()
    }

    /// Name given at construction.
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// `<owner>.<name>`, or the bare name while unattached.
    pub fn full_name(&self) -> String {
        let owner = self.owner.read();
        if owner.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", owner, self.name)
        }
    }

    pub fn owner(&self) -> String {
        self.owner.read().clone()
    }

    pub fn attach(&self, owner: &str, broker: Arc<ObjectBroker>) {
        *self.owner.write() = owner.to_string();
        *self.broker.write() = Some(broker);
    }

    /// Broker used to publish servants.
    pub fn broker(&self) -> RtcResult<Arc<ObjectBroker>> {
        self.broker
            .read()
            .clone()
            .ok_or_else(|| RtcError::precondition(format!("port {} has no broker", self.name)))
    }

    /// Declare an interface. Names are unique per port.
    pub fn add_interface(
        &self,
        instance_name: &str,
        type_name: &str,
        polarity: PortInterfacePolarity,
    ) -> RtcResult<()> {
        let mut state = self.state.lock();
        if state
            .interfaces
            .iter()
            .any(|i| i.instance_name == instance_name && i.polarity == polarity)
        {
            return Err(RtcError::bad_param(format!(
                "interface {} already declared on {}",
                instance_name, self.name
            )));
        }
        state.interfaces.push(PortInterfaceProfile {
            instance_name: instance_name.to_string(),
            type_name: type_name.to_string(),
            polarity,
        });
        Ok(())
    }

    pub fn set_property(&self, key: &str, value: &str) {
        self.state.lock().properties.set_property(key, value);
    }

    pub fn properties(&self) -> Properties {
        self.state.lock().properties.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn profile(&self) -> PortProfile {
        let state = self.state.lock();
        PortProfile {
            name: self.full_name(),
            interfaces: state.interfaces.clone(),
            port_ref: self.port_ref(),
            owner: self.owner(),
            connector_profiles: state.connector_profiles.clone(),
            properties: state.properties.clone(),
        }
    }

    pub fn connector_profiles(&self) -> Vec<ConnectorProfile> {
        self.state.lock().connector_profiles.clone()
    }

    pub fn connector_profile(&self, connector_id: &str) -> Option<ConnectorProfile> {
        self.state
            .lock()
            .connector_profiles
            .iter()
            .find(|p| p.connector_id == connector_id)
            .cloned()
    }

    pub fn has_connector(&self, connector_id: &str) -> bool {
        self.state
            .lock()
            .connector_profiles
            .iter()
            .any(|p| p.connector_id == connector_id)
    }

    fn update_connector_profile(&self, profile: &ConnectorProfile) {
        let mut state = self.state.lock();
        match state
            .connector_profiles
            .iter_mut()
            .find(|p| p.connector_id == profile.connector_id)
        {
            Some(existing) => *existing = profile.clone(),
            None => state.connector_profiles.push(profile.clone()),
        }
    }

    fn erase_connector_profile(&self, connector_id: &str) -> Option<ConnectorProfile> {
        let mut state = self.state.lock();
        let idx = state
            .connector_profiles
            .iter()
            .position(|p| p.connector_id == connector_id)?;
        Some(state.connector_profiles.remove(idx))
    }

    pub(crate) fn listeners(&self) -> &PortConnectListeners {
        &self.listeners
    }

    /// Fire `on_connection_lost` for the connector `connector_id`.
    pub(crate) fn notify_connection_lost(&self, connector_id: &str) {
        if let Some(profile) = self.connector_profile(connector_id) {
            let name = self.full_name();
            log::warn!("[PortBase] {} lost connection {}", name, connector_id);
            self.listeners
                .each(|l| l.on_connection_lost(&name, &profile));
        }
    }

    fn connect_next(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        let idx = profile
            .index_of(self.id())
            .ok_or_else(|| RtcError::bad_param(format!("{} not in connector profile", self.name)))?;
        match profile.ports.get(idx + 1) {
            None => Ok(()),
            Some(next) => match next.upgrade() {
                Some(port) => port.notify_connect(profile),
                None => Err(RtcError::bad_param("next port in profile no longer exists")),
            },
        }
    }

    fn disconnect_next(&self, profile: &ConnectorProfile) -> RtcResult<()> {
        let Some(idx) = profile.index_of(self.id()) else {
            return Err(RtcError::bad_param(format!("{} not in connector profile", self.name)));
        };
        match profile.ports.get(idx + 1) {
            None => Ok(()),
            Some(next) => match next.upgrade() {
                Some(port) => port.notify_disconnect(&profile.connector_id),
                None => {
                    // Peer already destroyed: its side is gone with it.
                    log::debug!(
                        "[PortBase::disconnect_next] next port of {} gone, skipping",
                        self.name
                    );
                    Ok(())
                }
            },
        }
    }
}

/// Hooks a concrete port supplies to the handshake.
pub trait Port: Send + Sync + 'static {
    fn base(&self) -> &PortBase;

    /// Add this port's endpoint references to `profile.properties`.
    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> RtcResult<()>;

    /// Build connectors or bind placeholders from the complete profile.
    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> RtcResult<()>;

    /// Undo publish and subscribe for `profile`.
    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile);

    fn activate_connectors(&self) {}

    fn deactivate_connectors(&self) {}

    /// Release servants held for the port's lifetime.
    fn release(&self) {}
}

fn code<T>(result: &RtcResult<T>) -> ReturnCode {
    ReturnCode::from(result)
}

impl<P: Port> PortService for P {
    fn port_ref(&self) -> PortRef {
        self.base().port_ref()
    }

    fn name(&self) -> String {
        self.base().full_name()
    }

    fn get_port_profile(&self) -> PortProfile {
        self.base().profile()
    }

    fn get_connector_profiles(&self) -> Vec<ConnectorProfile> {
        self.base().connector_profiles()
    }

    fn get_connector_profile(&self, connector_id: &str) -> Option<ConnectorProfile> {
        self.base().connector_profile(connector_id)
    }

    fn connect(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        let base = self.base();
        if profile.ports.is_empty() {
            return Err(RtcError::bad_param("connector profile has no ports"));
        }
        if profile.connector_id.is_empty() {
            let mut id = uuid::Uuid::new_v4().to_string();
            while base.has_connector(&id) {
                id = uuid::Uuid::new_v4().to_string();
            }
            profile.connector_id = id;
        } else if base.has_connector(&profile.connector_id) {
            return Err(RtcError::precondition(format!(
                "connector id {} already in use on {}",
                profile.connector_id,
                base.full_name()
            )));
        }
        log::debug!(
            "[PortBase::connect] {} connecting {} ({} ports)",
            base.full_name(),
            profile.connector_id,
            profile.ports.len()
        );

        let master = profile.ports[0]
            .upgrade()
            .ok_or_else(|| RtcError::bad_param("first port of the profile no longer exists"))?;
        match master.notify_connect(profile) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!(
                    "[PortBase::connect] {} failed: {}, rolling back",
                    profile.connector_id,
                    e
                );
                if let Err(cleanup) = master.notify_disconnect(&profile.connector_id) {
                    log::debug!("[PortBase::connect] rollback reported {}", cleanup);
                }
                Err(e)
            }
        }
    }

    fn notify_connect(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        let base = self.base();
        let name = base.full_name();
        log::debug!("[PortBase::notify_connect] {} <- {}", name, profile.connector_id);
        base.listeners().each(|l| l.on_notify_connect(&name, &*profile));

        let published = self.publish_interfaces(profile);
        if let Err(e) = &published {
            log::warn!("[PortBase::notify_connect] {} publish failed: {}", name, e);
        }
        base.listeners()
            .each(|l| l.on_publish_interfaces(&name, &*profile, code(&published)));

        let next = base.connect_next(profile);
        base.listeners()
            .each(|l| l.on_connect_next(&name, &*profile, code(&next)));

        let subscribed = self.subscribe_interfaces(profile);
        if let Err(e) = &subscribed {
            log::warn!("[PortBase::notify_connect] {} subscribe failed: {}", name, e);
        }
        base.listeners()
            .each(|l| l.on_subscribe_interfaces(&name, &*profile, code(&subscribed)));

        base.update_connector_profile(profile);

        let result = published.and(next).and(subscribed);
        let ret = code(&result);
        base.listeners().each(|l| l.on_connected(&name, &*profile, ret));
        result
    }

    fn disconnect(&self, connector_id: &str) -> RtcResult<()> {
        let base = self.base();
        let profile = base.connector_profile(connector_id).ok_or_else(|| {
            RtcError::bad_param(format!("no connector {} on {}", connector_id, base.full_name()))
        })?;
        match profile.ports.first().and_then(PortRef::upgrade) {
            Some(master) => master.notify_disconnect(connector_id),
            None => self.notify_disconnect(connector_id),
        }
    }

    fn notify_disconnect(&self, connector_id: &str) -> RtcResult<()> {
        let base = self.base();
        let name = base.full_name();
        let profile = base.connector_profile(connector_id).ok_or_else(|| {
            RtcError::bad_param(format!("no connector {} on {}", connector_id, name))
        })?;
        log::debug!("[PortBase::notify_disconnect] {} -x- {}", name, connector_id);
        base.listeners().each(|l| l.on_notify_disconnect(&name, &profile));

        let next = base.disconnect_next(&profile);
        base.listeners()
            .each(|l| l.on_disconnect_next(&name, &profile, code(&next)));

        base.listeners()
            .each(|l| l.on_unsubscribe_interfaces(&name, &profile));
        self.unsubscribe_interfaces(&profile);
        base.erase_connector_profile(connector_id);

        let ret = code(&next);
        base.listeners().each(|l| l.on_disconnected(&name, &profile, ret));
        next
    }

    fn disconnect_all(&self) -> RtcResult<()> {
        let ids: Vec<String> = self
            .base()
            .connector_profiles()
            .into_iter()
            .map(|p| p.connector_id)
            .collect();
        let mut first_err = None;
        for id in ids {
            if let Err(e) = self.disconnect(&id) {
                log::debug!("[PortBase::disconnect_all] {}: {}", id, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn activate_interfaces(&self) {
        self.base().set_active(true);
        self.activate_connectors();
    }

    fn deactivate_interfaces(&self) {
        self.base().set_active(false);
        self.deactivate_connectors();
    }

    fn attach(&self, owner: &str, broker: Arc<ObjectBroker>) {
        self.base().attach(owner, broker);
    }

    fn shutdown(&self) {
        self.deactivate_interfaces();
        if let Err(e) = self.disconnect_all() {
            log::debug!("[PortBase::shutdown] {}: {}", self.base().full_name(), e);
        }
        self.release();
    }

    fn add_connect_listener(&self, listener: Arc<dyn PortConnectListener>) {
        self.base().listeners().add(listener);
    }

    fn remove_connect_listener(&self, listener: &Arc<dyn PortConnectListener>) -> bool {
        self.base().listeners().remove(listener)
    }
}
