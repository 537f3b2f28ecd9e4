// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed input data port.

use super::base::{Port, PortBase};
use super::connector::{InPortConnector, InPortPullConnector, InPortPushConnector};
use super::dataflow::{self, DataflowType};
use super::listener::{ConnectorDataListener, ConnectorListener};
use super::{
    ConnectorInfo, ConnectorListeners, ConnectorProfile, DataPortStatus, PortService,
    CDR_INTERFACE, INPORT_REF_KEY,
};
use crate::cdr::{deserialize, CdrData};
use crate::error::RtcResult;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// Input port carrying values of `T`.
///
/// Reads come from the first connector; additional connectors only buffer.
pub struct InPort<T: CdrData> {
    base: PortBase,
    connectors: RwLock<Vec<Arc<dyn InPortConnector>>>,
    listeners: Arc<ConnectorListeners>,
    value: Mutex<T>,
}

impl<T: CdrData> InPort<T> {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn PortService> = weak.clone();
            let base = PortBase::new(name, this);
            base.set_property("port.port_type", "DataInPort");
            base.set_property("dataport.data_type", T::TYPE_NAME);
            base.set_property("dataport.dataflow_type", "push,pull");
            base.set_property("dataport.interface_type", CDR_INTERFACE);
            base.set_property("dataport.subscription_type", "flush,new,periodic");
            Self {
                base,
                connectors: RwLock::new(Vec::new()),
                listeners: Arc::new(ConnectorListeners::new()),
                value: Mutex::new(T::default()),
            }
        })
    }

    /// Read the next value.
    ///
    /// Without connectors this reports `PreconditionNotMet`. Payloads that do
    /// not decode as `T` report `PortError`.
    pub fn read(&self) -> Result<T, DataPortStatus> {
        let connector = self
            .connectors
            .read()
            .first()
            .cloned()
            .ok_or(DataPortStatus::PreconditionNotMet)?;
        let data = connector.read()?;
        let value: T = deserialize(&data).map_err(|e| {
            log::warn!("[InPort::read] {}: undecodable payload: {}", self.base.full_name(), e);
            DataPortStatus::PortError
        })?;
        *self.value.lock() = value.clone();
        Ok(value)
    }

    /// Last value returned by [`read`](Self::read).
    pub fn value(&self) -> T {
        self.value.lock().clone()
    }

    /// True when unread data is waiting in the first connector.
    pub fn is_new(&self) -> bool {
        self.connectors
            .read()
            .first()
            .is_some_and(|c| c.buffer().readable() > 0)
    }

    pub fn is_empty(&self) -> bool {
        !self.is_new()
    }

    pub fn connector_ids(&self) -> Vec<String> {
        self.connectors.read().iter().map(|c| c.id().to_string()).collect()
    }

    pub fn connector(&self, connector_id: &str) -> Option<Arc<dyn InPortConnector>> {
        self.connectors
            .read()
            .iter()
            .find(|c| c.id() == connector_id)
            .cloned()
    }

    pub fn add_connector_data_listener(&self, listener: Arc<dyn ConnectorDataListener>) {
        self.listeners.add_data_listener(listener);
    }

    pub fn remove_connector_data_listener(
        &self,
        listener: &Arc<dyn ConnectorDataListener>,
    ) -> bool {
        self.listeners.remove_data_listener(listener)
    }

    pub fn add_connector_listener(&self, listener: Arc<dyn ConnectorListener>) {
        self.listeners.add_listener(listener);
    }

    pub fn remove_connector_listener(&self, listener: &Arc<dyn ConnectorListener>) -> bool {
        self.listeners.remove_listener(listener)
    }

    fn add_connector(&self, connector: Arc<dyn InPortConnector>) {
        if self.base.is_active() {
            if let Err(e) = connector.activate() {
                log::error!("[InPort::add_connector] {}: activation failed: {}", connector.id(), e);
            }
        }
        self.connectors.write().push(connector);
    }
}

impl<T: CdrData> Port for InPort<T> {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        if dataflow::check_profile(profile, T::TYPE_NAME)? != DataflowType::Push {
            return Ok(());
        }
        let connector = InPortPushConnector::new(
            ConnectorInfo::from(&*profile),
            self.base.broker()?,
            self.listeners.clone(),
        )?;
        profile
            .properties
            .set_property(INPORT_REF_KEY, &connector.provider_key().to_string());
        self.add_connector(Arc::new(connector));
        Ok(())
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> RtcResult<()> {
        if dataflow::dataflow_of(profile) != DataflowType::Pull {
            return Ok(());
        }
        let broker = self.base.broker()?;
        let connector = InPortPullConnector::new(
            ConnectorInfo::from(profile),
            &broker,
            self.listeners.clone(),
        )?;
        self.add_connector(Arc::new(connector));
        Ok(())
    }

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile) {
        let removed: Vec<_> = {
            let mut connectors = self.connectors.write();
            let (gone, kept) = connectors
                .drain(..)
                .partition(|c| c.id() == profile.connector_id);
            *connectors = kept;
            gone
        };
        for connector in removed {
            connector.disconnect();
        }
    }

    fn activate_connectors(&self) {
        for connector in self.connectors.read().iter() {
            if let Err(e) = connector.activate() {
                log::error!("[InPort::activate] {}: {}", connector.id(), e);
            }
        }
    }

    fn deactivate_connectors(&self) {
        for connector in self.connectors.read().iter() {
            connector.deactivate();
        }
    }
}
