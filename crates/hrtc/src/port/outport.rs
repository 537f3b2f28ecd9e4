// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed output data port.

use super::base::{Port, PortBase};
use super::connector::{OutPortConnector, OutPortPullConnector, OutPortPushConnector};
use super::consumer::InPortCdrConsumer;
use super::dataflow::{self, DataflowType};
use super::listener::{ConnectorDataListener, ConnectorListener};
use super::{
    ConnectorInfo, ConnectorListeners, ConnectorProfile, DataPortStatus, PortService,
    CDR_INTERFACE, OUTPORT_REF_KEY,
};
use crate::cdr::{serialize, ByteData, CdrData, Endian};
use crate::error::RtcResult;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// Output port carrying values of `T`.
///
/// ```ignore
/// let out = OutPort::<TimedDouble>::new("out");
/// out.write(&TimedDouble::now(1.5));
/// ```
pub struct OutPort<T: CdrData> {
    base: PortBase,
    connectors: RwLock<Vec<Arc<dyn OutPortConnector>>>,
    listeners: Arc<ConnectorListeners>,
    _marker: PhantomData<fn(T)>,
}

impl<T: CdrData> OutPort<T> {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn PortService> = weak.clone();
            let base = PortBase::new(name, this);
            base.set_property("port.port_type", "DataOutPort");
            base.set_property("dataport.data_type", T::TYPE_NAME);
            base.set_property("dataport.dataflow_type", "push,pull");
            base.set_property("dataport.interface_type", CDR_INTERFACE);
            base.set_property("dataport.subscription_type", "flush,new,periodic");
            Self {
                base,
                connectors: RwLock::new(Vec::new()),
                listeners: Arc::new(ConnectorListeners::new()),
                _marker: PhantomData,
            }
        })
    }

    /// Serialize `value` and hand it to every connector.
    ///
    /// Returns the first non-OK connector status, or `PortOk`.
    pub fn write(&self, value: &T) -> DataPortStatus {
        let connectors = self.connectors.read().clone();
        let mut encoded: [Option<ByteData>; 2] = [None, None];
        let mut result = DataPortStatus::PortOk;
        for connector in &connectors {
            let endian = connector.endian();
            let slot = match endian {
                Endian::Little => 0,
                Endian::Big => 1,
            };
            let data = encoded[slot].get_or_insert_with(|| serialize(value, endian));
            let ret = connector.write(data);
            if ret == DataPortStatus::ConnectionLost {
                self.base.notify_connection_lost(connector.id());
            }
            if !ret.is_ok() {
                log::debug!(
                    "[OutPort::write] {} on {}: {}",
                    self.base.full_name(),
                    connector.id(),
                    ret
                );
                if result.is_ok() {
                    result = ret;
                }
            }
        }
        result
    }

    pub fn connector_ids(&self) -> Vec<String> {
        self.connectors.read().iter().map(|c| c.id().to_string()).collect()
    }

    pub fn connector(&self, connector_id: &str) -> Option<Arc<dyn OutPortConnector>> {
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

    fn add_connector(&self, connector: Arc<dyn OutPortConnector>) {
        if self.base.is_active() {
            if let Err(e) = connector.activate() {
                log::error!(
                    "[OutPort::add_connector] {}: activation failed: {}",
                    connector.id(),
                    e
                );
            }
        }
        self.connectors.write().push(connector);
    }
}

impl<T: CdrData> Port for OutPort<T> {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        if dataflow::check_profile(profile, T::TYPE_NAME)? != DataflowType::Pull {
            return Ok(());
        }
        let connector = OutPortPullConnector::new(
            ConnectorInfo::from(&*profile),
            self.base.broker()?,
            self.listeners.clone(),
        )?;
        profile
            .properties
            .set_property(OUTPORT_REF_KEY, &connector.provider_key().to_string());
        self.add_connector(Arc::new(connector));
        Ok(())
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> RtcResult<()> {
        if dataflow::dataflow_of(profile) != DataflowType::Push {
            return Ok(());
        }
        let broker = self.base.broker()?;
        let consumer = InPortCdrConsumer::subscribe(&broker, &profile.properties)?;
        let connector = OutPortPushConnector::new(
            ConnectorInfo::from(profile),
            Arc::new(consumer),
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
                log::error!("[OutPort::activate] {}: {}", connector.id(), e);
            }
        }
    }

    fn deactivate_connectors(&self) {
        let connectors = self.connectors.read().clone();
        for connector in connectors {
            connector.deactivate();
        }
    }
}
