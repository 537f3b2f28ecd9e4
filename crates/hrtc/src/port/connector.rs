// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connectors: the live half of a connection held by one port.
//!
//! | Connector              | Owns                          | Created by              |
//! |------------------------|-------------------------------|-------------------------|
//! | `OutPortPushConnector` | buffer, publisher, consumer   | output port, subscribe  |
//! | `InPortPushConnector`  | buffer, provider              | input port, publish     |
//! | `OutPortPullConnector` | buffer, provider              | output port, publish    |
//! | `InPortPullConnector`  | buffer, consumer              | input port, subscribe   |
//!
//! Providers are registered with the broker for the connector's lifetime and
//! released by `disconnect` or when the connector is dropped. The broker holds
//! the only strong reference, so a dropped port is seen by its peer as a lost
//! connection.

use super::consumer::{InPortConsumer, OutPortCdrConsumer};
use super::dataflow;
use super::listener::ConnectorListenerType as C;
use super::provider::{InPortCdrProvider, OutPortCdrProvider};
use super::publisher::{create_publisher, Publisher, PublisherConfig};
use super::{ConnectorInfo, ConnectorListeners, DataPortStatus};
use crate::broker::{ObjectBroker, ObjectId};
use crate::buffer::{buffer_from_properties, Buffer};
use crate::cdr::{ByteData, Endian};
use crate::error::RtcResult;
use std::sync::Arc;

fn endian_of(info: &ConnectorInfo) -> Endian {
    Endian::from_list(info.properties.get_property("serializer.cdr.endian"))
}

/// Output side of a connection.
pub trait OutPortConnector: Send + Sync {
    fn info(&self) -> &ConnectorInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    /// Byte order payloads are encoded with on this connection.
    fn endian(&self) -> Endian;

    fn buffer(&self) -> &Arc<dyn Buffer>;

    fn write(&self, data: &ByteData) -> DataPortStatus;

    fn activate(&self) -> RtcResult<()>;

    fn deactivate(&self);

    /// Stop workers and release transport resources.
    fn disconnect(&self);
}

/// Input side of a connection.
pub trait InPortConnector: Send + Sync {
    fn info(&self) -> &ConnectorInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn buffer(&self) -> &Arc<dyn Buffer>;

    /// Next payload for the component.
    fn read(&self) -> Result<ByteData, DataPortStatus>;

    fn activate(&self) -> RtcResult<()> {
        Ok(())
    }

    fn deactivate(&self) {}

    fn disconnect(&self);
}

/// Output push connector: buffer → publisher → remote provider.
pub struct OutPortPushConnector {
    info: ConnectorInfo,
    endian: Endian,
    buffer: Arc<dyn Buffer>,
    publisher: Box<dyn Publisher>,
    listeners: Arc<ConnectorListeners>,
}

impl OutPortPushConnector {
    pub fn new(
        info: ConnectorInfo,
        consumer: Arc<dyn InPortConsumer>,
        listeners: Arc<ConnectorListeners>,
    ) -> RtcResult<Self> {
        let buffer = buffer_from_properties(&info.properties)?;
        let config = PublisherConfig::from_info(&info)?;
        log::debug!(
            "[OutPortPushConnector::new] {} {} / {:?}",
            info.id,
            config.subscription_type.as_str(),
            config.push_policy
        );
        let publisher = create_publisher(
            config,
            info.clone(),
            consumer,
            buffer.clone(),
            listeners.clone(),
        );
        listeners.notify(C::OnConnect, &info);
        Ok(Self {
            endian: endian_of(&info),
            info,
            buffer,
            publisher,
            listeners,
        })
    }

    /// Result of the most recent send.
    pub fn last_status(&self) -> DataPortStatus {
        self.publisher.last_status()
    }
}

impl OutPortConnector for OutPortPushConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    fn write(&self, data: &ByteData) -> DataPortStatus {
        self.publisher.write(data)
    }

    fn activate(&self) -> RtcResult<()> {
        self.publisher.activate()
    }

    fn deactivate(&self) {
        self.publisher.deactivate();
    }

    fn disconnect(&self) {
        self.publisher.deactivate();
        self.buffer.reset();
        self.listeners.notify(C::OnDisconnect, &self.info);
    }
}

/// Output pull connector: writes land in the buffer served by the provider.
pub struct OutPortPullConnector {
    info: ConnectorInfo,
    endian: Endian,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    broker: Arc<ObjectBroker>,
    provider_key: ObjectId,
}

impl OutPortPullConnector {
    pub fn new(
        info: ConnectorInfo,
        broker: Arc<ObjectBroker>,
        listeners: Arc<ConnectorListeners>,
    ) -> RtcResult<Self> {
        let buffer = buffer_from_properties(&info.properties)?;
        let provider = Arc::new(OutPortCdrProvider::new(
            buffer.clone(),
            listeners.clone(),
            info.clone(),
        ));
        let provider_key = broker.activate_object(provider);
        listeners.notify(C::OnConnect, &info);
        Ok(Self {
            endian: endian_of(&info),
            info,
            buffer,
            listeners,
            broker,
            provider_key,
        })
    }

    /// Object key peers use to reach the provider.
    pub fn provider_key(&self) -> ObjectId {
        self.provider_key
    }
}

impl OutPortConnector for OutPortPullConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    fn write(&self, data: &ByteData) -> DataPortStatus {
        let status = dataflow::store(self.buffer.as_ref(), &self.listeners, &self.info, data);
        dataflow::write_status(status)
    }

    fn activate(&self) -> RtcResult<()> {
        Ok(())
    }

    fn deactivate(&self) {}

    fn disconnect(&self) {
        self.broker.deactivate_object(self.provider_key);
        self.listeners.notify(C::OnDisconnect, &self.info);
    }
}

impl Drop for OutPortPullConnector {
    fn drop(&mut self) {
        self.broker.deactivate_object(self.provider_key);
    }
}

/// Input push connector: the provider fills the buffer, `read` drains it.
pub struct InPortPushConnector {
    info: ConnectorInfo,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    broker: Arc<ObjectBroker>,
    provider_key: ObjectId,
}

impl InPortPushConnector {
    pub fn new(
        info: ConnectorInfo,
        broker: Arc<ObjectBroker>,
        listeners: Arc<ConnectorListeners>,
    ) -> RtcResult<Self> {
        let buffer = buffer_from_properties(&info.properties)?;
        let provider = Arc::new(InPortCdrProvider::new(
            buffer.clone(),
            listeners.clone(),
            info.clone(),
        ));
        let provider_key = broker.activate_object(provider);
        listeners.notify(C::OnConnect, &info);
        Ok(Self {
            info,
            buffer,
            listeners,
            broker,
            provider_key,
        })
    }

    pub fn provider_key(&self) -> ObjectId {
        self.provider_key
    }
}

impl InPortConnector for InPortPushConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    fn read(&self) -> Result<ByteData, DataPortStatus> {
        dataflow::take(self.buffer.as_ref(), &self.listeners, &self.info)
    }

    fn disconnect(&self) {
        self.broker.deactivate_object(self.provider_key);
        self.listeners.notify(C::OnDisconnect, &self.info);
    }
}

impl Drop for InPortPushConnector {
    fn drop(&mut self) {
        self.broker.deactivate_object(self.provider_key);
    }
}

/// Input pull connector: each `read` fetches from the remote provider.
pub struct InPortPullConnector {
    info: ConnectorInfo,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    consumer: OutPortCdrConsumer,
}

impl InPortPullConnector {
    pub fn new(
        info: ConnectorInfo,
        broker: &ObjectBroker,
        listeners: Arc<ConnectorListeners>,
    ) -> RtcResult<Self> {
        let buffer = buffer_from_properties(&info.properties)?;
        let consumer =
            OutPortCdrConsumer::subscribe(broker, buffer.clone(), listeners.clone(), info.clone())?;
        listeners.notify(C::OnConnect, &info);
        Ok(Self {
            info,
            buffer,
            listeners,
            consumer,
        })
    }
}

impl InPortConnector for InPortPullConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    fn read(&self) -> Result<ByteData, DataPortStatus> {
        match self.consumer.get() {
            DataPortStatus::PortOk => {
                dataflow::take(self.buffer.as_ref(), &self.listeners, &self.info)
            }
            other => Err(other),
        }
    }

    fn disconnect(&self) {
        self.buffer.reset();
        self.listeners.notify(C::OnDisconnect, &self.info);
    }
}
