// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Consumers: the calling side of a connection.
//!
//! A consumer resolves the peer provider's object key at subscribe time and
//! keeps only a weak reference to it. Once the provider has been released
//! (peer disconnected or destroyed) every call reports
//! [`DataPortStatus::ConnectionLost`].

use super::dataflow;
use super::listener::{ConnectorDataListenerType as D, ConnectorListenerType as C};
use super::provider::{InPortCdrProvider, OutPortCdrProvider};
use super::{ConnectorInfo, ConnectorListeners, DataPortStatus, INPORT_REF_KEY, OUTPORT_REF_KEY};
use crate::broker::ObjectBroker;
use crate::buffer::{Buffer, BufferStatus};
use crate::cdr::ByteData;
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use std::sync::{Arc, Weak};

/// Sending side of a push connection, as seen by a publisher.
pub trait InPortConsumer: Send + Sync {
    fn put(&self, data: &ByteData) -> DataPortStatus;
}

fn lookup<T: std::any::Any + Send + Sync>(
    broker: &ObjectBroker,
    prop: &Properties,
    key: &str,
) -> RtcResult<Arc<T>> {
    let reference = prop.get_property(key);
    if reference.is_empty() {
        return Err(RtcError::bad_param(format!("{} missing from connector profile", key)));
    }
    broker.string_to_object::<T>(reference)
}

/// Push consumer bound to an [`InPortCdrProvider`].
pub struct InPortCdrConsumer {
    provider: Weak<InPortCdrProvider>,
}

impl InPortCdrConsumer {
    /// Resolve `dataport.corba_cdr.inport_ref` from the profile properties.
    pub fn subscribe(broker: &ObjectBroker, prop: &Properties) -> RtcResult<Self> {
        let provider = lookup::<InPortCdrProvider>(broker, prop, INPORT_REF_KEY)?;
        Ok(Self {
            provider: Arc::downgrade(&provider),
        })
    }
}

impl InPortConsumer for InPortCdrConsumer {
    fn put(&self, data: &ByteData) -> DataPortStatus {
        let Some(provider) = self.provider.upgrade() else {
            return DataPortStatus::ConnectionLost;
        };
        match provider.put(data) {
            DataPortStatus::PortOk => DataPortStatus::PortOk,
            DataPortStatus::PortError => DataPortStatus::PortError,
            DataPortStatus::BufferFull => DataPortStatus::SendFull,
            DataPortStatus::BufferTimeout => DataPortStatus::SendTimeout,
            DataPortStatus::ConnectionLost => DataPortStatus::ConnectionLost,
            _ => DataPortStatus::UnknownError,
        }
    }
}

/// Pull consumer bound to an [`OutPortCdrProvider`]; stores what it fetches
/// in the input connector's buffer.
pub struct OutPortCdrConsumer {
    provider: Weak<OutPortCdrProvider>,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    info: ConnectorInfo,
}

impl OutPortCdrConsumer {
    /// Resolve `dataport.corba_cdr.outport_ref` from the profile properties.
    pub fn subscribe(
        broker: &ObjectBroker,
        buffer: Arc<dyn Buffer>,
        listeners: Arc<ConnectorListeners>,
        info: ConnectorInfo,
    ) -> RtcResult<Self> {
        let provider = lookup::<OutPortCdrProvider>(broker, &info.properties, OUTPORT_REF_KEY)?;
        Ok(Self {
            provider: Arc::downgrade(&provider),
            buffer,
            listeners,
            info,
        })
    }

    /// Fetch one payload from the provider into the local buffer.
    pub fn get(&self) -> DataPortStatus {
        let Some(provider) = self.provider.upgrade() else {
            self.listeners.notify(C::OnSenderError, &self.info);
            return DataPortStatus::ConnectionLost;
        };
        match provider.get() {
            Ok(data) => {
                self.listeners.notify_data(D::OnReceived, &self.info, &data);
                let status =
                    dataflow::store(self.buffer.as_ref(), &self.listeners, &self.info, &data);
                if status == BufferStatus::Ok {
                    DataPortStatus::PortOk
                } else {
                    dataflow::write_status(status)
                }
            }
            Err(DataPortStatus::BufferEmpty) => {
                self.listeners.notify(C::OnSenderEmpty, &self.info);
                DataPortStatus::BufferEmpty
            }
            Err(DataPortStatus::BufferTimeout) => {
                self.listeners.notify(C::OnSenderTimeout, &self.info);
                DataPortStatus::BufferTimeout
            }
            Err(other) => {
                self.listeners.notify(C::OnSenderError, &self.info);
                other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferConfig, RingBuffer};
    use crate::cdr::Endian;

    #[test]
    fn test_push_consumer_reports_connection_lost() {
        let broker = ObjectBroker::new();
        let buffer: Arc<dyn Buffer> = Arc::new(RingBuffer::new(BufferConfig::default()));
        let provider = Arc::new(InPortCdrProvider::new(
            buffer.clone(),
            Arc::new(ConnectorListeners::new()),
            ConnectorInfo::default(),
        ));
        let key = broker.activate_object(provider.clone());
        let mut prop = Properties::new();
        prop.set_property(INPORT_REF_KEY, &key.to_string());

        let consumer = InPortCdrConsumer::subscribe(&broker, &prop).expect("subscribe");
        let data = ByteData::new(vec![1u8], Endian::Little);
        assert_eq!(consumer.put(&data), DataPortStatus::PortOk);
        assert_eq!(buffer.readable(), 1);

        broker.deactivate_object(key);
        drop(provider);
        assert_eq!(consumer.put(&data), DataPortStatus::ConnectionLost);
    }

    #[test]
    fn test_subscribe_without_reference_fails() {
        let broker = ObjectBroker::new();
        assert!(matches!(
            InPortCdrConsumer::subscribe(&broker, &Properties::new()),
            Err(RtcError::BadParameter(_))
        ));
    }
}
