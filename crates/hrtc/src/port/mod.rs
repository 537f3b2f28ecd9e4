// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ports and the connection handshake.
//!
//! A port is a named attachment point on a component. Connecting ports runs a
//! handshake across every port named in a [`ConnectorProfile`]: the first
//! (master) port calls `notify_connect` on `ports[0]`, which publishes its
//! interfaces, forwards the profile to the next port, subscribes to the
//! interfaces the others published and records the profile. Data ports
//! ([`OutPort`], [`InPort`]) build connectors while subscribing; service ports
//! ([`ServicePort`]) bind consumer placeholders to provider servants.
//!
//! Endpoint references travel as object keys in the profile properties:
//!
//! ```text
//! dataport.corba_cdr.inport_ref   provider of a push input port
//! dataport.corba_cdr.outport_ref  provider of a pull output port
//! port.<type>.<instance>          provided service interface
//! ```

mod base;
mod dataflow;
pub mod connector;
pub mod consumer;
mod inport;
pub mod listener;
mod outport;
pub mod provider;
pub mod publisher;
mod service_port;

pub use base::{Port, PortBase};
pub use connector::{
    InPortConnector, InPortPullConnector, InPortPushConnector, OutPortConnector,
    OutPortPullConnector, OutPortPushConnector,
};
pub use inport::InPort;
pub use listener::{
    ConnectorDataListener, ConnectorDataListenerType, ConnectorListener, ConnectorListenerType,
    ConnectorListeners, PortConnectListener,
};
pub use outport::OutPort;
pub use service_port::{ServiceConsumer, ServicePort};

use crate::broker::{ObjectBroker, ObjectId};
use crate::error::RtcResult;
use crate::properties::Properties;
use std::fmt;
use std::sync::{Arc, Weak};

/// Interface type of the built-in data transport.
pub const CDR_INTERFACE: &str = "corba_cdr";

/// Profile key of the push input provider reference.
pub const INPORT_REF_KEY: &str = "dataport.corba_cdr.inport_ref";

/// Profile key of the pull output provider reference.
pub const OUTPORT_REF_KEY: &str = "dataport.corba_cdr.outport_ref";

/// Status returned by data port and transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataPortStatus {
    PortOk,
    PortError,
    BufferError,
    BufferFull,
    BufferEmpty,
    BufferTimeout,
    SendFull,
    SendTimeout,
    RecvEmpty,
    RecvTimeout,
    InvalidArgs,
    PreconditionNotMet,
    ConnectionLost,
    UnknownError,
}

impl DataPortStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PortOk => "PORT_OK",
            Self::PortError => "PORT_ERROR",
            Self::BufferError => "BUFFER_ERROR",
            Self::BufferFull => "BUFFER_FULL",
            Self::BufferEmpty => "BUFFER_EMPTY",
            Self::BufferTimeout => "BUFFER_TIMEOUT",
            Self::SendFull => "SEND_FULL",
            Self::SendTimeout => "SEND_TIMEOUT",
            Self::RecvEmpty => "RECV_EMPTY",
            Self::RecvTimeout => "RECV_TIMEOUT",
            Self::InvalidArgs => "INVALID_ARGS",
            Self::PreconditionNotMet => "PRECONDITION_NOT_MET",
            Self::ConnectionLost => "CONNECTION_LOST",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::PortOk
    }
}

impl fmt::Display for DataPortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a port interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortInterfacePolarity {
    Provided,
    Required,
}

/// One interface exposed or required by a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInterfaceProfile {
    pub instance_name: String,
    pub type_name: String,
    pub polarity: PortInterfacePolarity,
}

/// Non-owning handle to a port.
///
/// Equality and hashing use the object id only.
#[derive(Clone)]
pub struct PortRef {
    id: ObjectId,
    port: Weak<dyn PortService>,
}

impl PortRef {
    pub fn new(id: ObjectId, port: Weak<dyn PortService>) -> Self {
        Self { id, port }
    }

    /// Reference to a live port.
    pub fn from_port(port: &Arc<dyn PortService>) -> Self {
        port.port_ref()
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Arc<dyn PortService>> {
        self.port.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.port.strong_count() > 0
    }
}

impl PartialEq for PortRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PortRef {}

impl std::hash::Hash for PortRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Description of one connection, shared by value among its ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorProfile {
    pub name: String,
    /// UUID; generated by the master port when empty.
    pub connector_id: String,
    /// Participating ports; element 0 is the master.
    pub ports: Vec<PortRef>,
    pub properties: Properties,
}

impl ConnectorProfile {
    pub fn new(name: &str, ports: Vec<PortRef>) -> Self {
        Self {
            name: name.to_string(),
            connector_id: String::new(),
            ports,
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.set_property(key, value);
        self
    }

    /// Position of `id` in the port list.
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.ports.iter().position(|p| p.id() == id)
    }
}

/// Snapshot of a port.
#[derive(Debug, Clone)]
pub struct PortProfile {
    pub name: String,
    pub interfaces: Vec<PortInterfaceProfile>,
    pub port_ref: PortRef,
    /// Instance name of the owning component (empty while unattached).
    pub owner: String,
    pub connector_profiles: Vec<ConnectorProfile>,
    pub properties: Properties,
}

/// Connection view handed to connectors, publishers and listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorInfo {
    pub name: String,
    pub id: String,
    /// Object keys of the participating ports.
    pub ports: Vec<String>,
    pub properties: Properties,
}

impl From<&ConnectorProfile> for ConnectorInfo {
    fn from(profile: &ConnectorProfile) -> Self {
        Self {
            name: profile.name.clone(),
            id: profile.connector_id.clone(),
            ports: profile.ports.iter().map(|p| p.id().to_string()).collect(),
            properties: profile.properties.clone(),
        }
    }
}

/// Remote-facing operations of every port.
///
/// Implemented for all [`Port`] types by the handshake in [`base`].
pub trait PortService: Send + Sync {
    fn port_ref(&self) -> PortRef;

    /// Full port name (`<instance>.<port>` once attached to a component).
    fn name(&self) -> String;

    fn get_port_profile(&self) -> PortProfile;

    fn get_connector_profiles(&self) -> Vec<ConnectorProfile>;

    fn get_connector_profile(&self, connector_id: &str) -> Option<ConnectorProfile>;

    /// Run the handshake as master. On success `profile` holds the final
    /// profile, including the generated connector id.
    fn connect(&self, profile: &mut ConnectorProfile) -> RtcResult<()>;

    fn notify_connect(&self, profile: &mut ConnectorProfile) -> RtcResult<()>;

    fn disconnect(&self, connector_id: &str) -> RtcResult<()>;

    fn notify_disconnect(&self, connector_id: &str) -> RtcResult<()>;

    fn disconnect_all(&self) -> RtcResult<()>;

    /// Start the workers of every connector (component activation).
    fn activate_interfaces(&self);

    /// Stop the workers of every connector (component deactivation).
    fn deactivate_interfaces(&self);

    /// Bind the port to its component and broker.
    fn attach(&self, owner: &str, broker: Arc<ObjectBroker>);

    /// Disconnect everything and release published servants.
    fn shutdown(&self);

    fn add_connect_listener(&self, listener: Arc<dyn PortConnectListener>);

    fn remove_connect_listener(&self, listener: &Arc<dyn PortConnectListener>) -> bool;
}

/// Connect two or more ports with default properties plus `props`.
///
/// The first port acts as master.
pub fn connect_ports(
    name: &str,
    ports: &[&Arc<dyn PortService>],
    props: &[(&str, &str)],
) -> RtcResult<ConnectorProfile> {
    let refs = ports.iter().map(|p| p.port_ref()).collect();
    let mut profile = ConnectorProfile::new(name, refs);
    for (k, v) in props {
        profile.properties.set_property(k, v);
    }
    let master = ports
        .first()
        .ok_or_else(|| crate::error::RtcError::bad_param("no ports to connect"))?;
    master.connect(&mut profile)?;
    Ok(profile)
}
