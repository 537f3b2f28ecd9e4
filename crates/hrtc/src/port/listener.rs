// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector and port listeners.
//!
//! Three listener families exist:
//!
//! - [`ConnectorDataListener`]: dataflow events that carry the payload
//!   (buffer write, send, receive, receiver errors).
//! - [`ConnectorListener`]: dataflow events without payload (buffer empty,
//!   sender errors, connect/disconnect of a connector).
//! - [`PortConnectListener`]: handshake events on a port.
//!
//! All trait methods default to no-ops. Listeners are stored in `ArcSwap`
//! snapshots so that notification never takes a lock; adding or removing a
//! listener while a publisher thread is notifying is safe.
//!
//! Listeners run on the thread that produced the event (publisher worker, EC
//! worker or caller) and must not block.

use super::ConnectorInfo;
use crate::cdr::ByteData;
use crate::error::ReturnCode;
use crate::port::ConnectorProfile;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Events that carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorDataListenerType {
    OnBufferWrite,
    OnBufferFull,
    OnBufferWriteTimeout,
    OnBufferOverwrite,
    OnBufferRead,
    OnSend,
    OnReceived,
    OnReceiverFull,
    OnReceiverTimeout,
    OnReceiverError,
}

impl ConnectorDataListenerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferWrite => "ON_BUFFER_WRITE",
            Self::OnBufferFull => "ON_BUFFER_FULL",
            Self::OnBufferWriteTimeout => "ON_BUFFER_WRITE_TIMEOUT",
            Self::OnBufferOverwrite => "ON_BUFFER_OVERWRITE",
            Self::OnBufferRead => "ON_BUFFER_READ",
            Self::OnSend => "ON_SEND",
            Self::OnReceived => "ON_RECEIVED",
            Self::OnReceiverFull => "ON_RECEIVER_FULL",
            Self::OnReceiverTimeout => "ON_RECEIVER_TIMEOUT",
            Self::OnReceiverError => "ON_RECEIVER_ERROR",
        }
    }
}

/// Events without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorListenerType {
    OnBufferEmpty,
    OnBufferReadTimeout,
    OnSenderEmpty,
    OnSenderTimeout,
    OnSenderError,
    OnConnect,
    OnDisconnect,
}

impl ConnectorListenerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferEmpty => "ON_BUFFER_EMPTY",
            Self::OnBufferReadTimeout => "ON_BUFFER_READ_TIMEOUT",
            Self::OnSenderEmpty => "ON_SENDER_EMPTY",
            Self::OnSenderTimeout => "ON_SENDER_TIMEOUT",
            Self::OnSenderError => "ON_SENDER_ERROR",
            Self::OnConnect => "ON_CONNECT",
            Self::OnDisconnect => "ON_DISCONNECT",
        }
    }
}

/// Dataflow callbacks that receive the serialized payload.
///
/// Use [`crate::cdr::deserialize`] to recover the typed value.
#[allow(unused_variables)]
pub trait ConnectorDataListener: Send + Sync {
    /// Payload stored in the local buffer.
    fn on_buffer_write(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Buffer full, payload rejected.
    fn on_buffer_full(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Blocking write timed out.
    fn on_buffer_write_timeout(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Oldest entry dropped to store this payload.
    fn on_buffer_overwrite(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Payload taken from the buffer for sending or reading.
    fn on_buffer_read(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Payload about to be handed to the transport.
    fn on_send(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Payload accepted by the receiving side.
    fn on_received(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Receiver buffer full.
    fn on_receiver_full(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Receiver timed out.
    fn on_receiver_timeout(&self, info: &ConnectorInfo, data: &ByteData) {}
    /// Receiver failed or is gone.
    fn on_receiver_error(&self, info: &ConnectorInfo, data: &ByteData) {}
}

/// Dataflow callbacks without payload.
#[allow(unused_variables)]
pub trait ConnectorListener: Send + Sync {
    fn on_buffer_empty(&self, info: &ConnectorInfo) {}
    fn on_buffer_read_timeout(&self, info: &ConnectorInfo) {}
    fn on_sender_empty(&self, info: &ConnectorInfo) {}
    fn on_sender_timeout(&self, info: &ConnectorInfo) {}
    fn on_sender_error(&self, info: &ConnectorInfo) {}
    fn on_connect(&self, info: &ConnectorInfo) {}
    fn on_disconnect(&self, info: &ConnectorInfo) {}
}

/// Listener set shared by a data port and all of its connectors.
#[derive(Default)]
pub struct ConnectorListeners {
    data: ArcSwap<Vec<Arc<dyn ConnectorDataListener>>>,
    plain: ArcSwap<Vec<Arc<dyn ConnectorListener>>>,
}

impl ConnectorListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data_listener(&self, listener: Arc<dyn ConnectorDataListener>) {
        self.data.rcu(|cur| {
            let mut next = Vec::clone(cur);
            next.push(listener.clone());
            next
        });
    }

    /// Remove by identity. Returns false when the listener was not registered.
    pub fn remove_data_listener(&self, listener: &Arc<dyn ConnectorDataListener>) -> bool {
        let before = self.data.load().len();
        self.data.rcu(|cur| {
            cur.iter()
                .filter(|l| !Arc::ptr_eq(l, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
        self.data.load().len() != before
    }

    pub fn add_listener(&self, listener: Arc<dyn ConnectorListener>) {
        self.plain.rcu(|cur| {
            let mut next = Vec::clone(cur);
            next.push(listener.clone());
            next
        });
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConnectorListener>) -> bool {
        let before = self.plain.load().len();
        self.plain.rcu(|cur| {
            cur.iter()
                .filter(|l| !Arc::ptr_eq(l, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
        self.plain.load().len() != before
    }

    pub fn notify_data(
        &self,
        kind: ConnectorDataListenerType,
        info: &ConnectorInfo,
        data: &ByteData,
    ) {
        let listeners = self.data.load();
        if listeners.is_empty() {
            return;
        }
        log::trace!("[ConnectorListeners] {} on {}", kind.as_str(), info.id);
        for l in listeners.iter() {
            match kind {
                ConnectorDataListenerType::OnBufferWrite => l.on_buffer_write(info, data),
                ConnectorDataListenerType::OnBufferFull => l.on_buffer_full(info, data),
                ConnectorDataListenerType::OnBufferWriteTimeout => {
                    l.on_buffer_write_timeout(info, data)
                }
                ConnectorDataListenerType::OnBufferOverwrite => l.on_buffer_overwrite(info, data),
                ConnectorDataListenerType::OnBufferRead => l.on_buffer_read(info, data),
                ConnectorDataListenerType::OnSend => l.on_send(info, data),
                ConnectorDataListenerType::OnReceived => l.on_received(info, data),
                ConnectorDataListenerType::OnReceiverFull => l.on_receiver_full(info, data),
                ConnectorDataListenerType::OnReceiverTimeout => l.on_receiver_timeout(info, data),
                ConnectorDataListenerType::OnReceiverError => l.on_receiver_error(info, data),
            }
        }
    }

    pub fn notify(&self, kind: ConnectorListenerType, info: &ConnectorInfo) {
        let listeners = self.plain.load();
        if listeners.is_empty() {
            return;
        }
        log::trace!("[ConnectorListeners] {} on {}", kind.as_str(), info.id);
        for l in listeners.iter() {
            match kind {
                ConnectorListenerType::OnBufferEmpty => l.on_buffer_empty(info),
                ConnectorListenerType::OnBufferReadTimeout => l.on_buffer_read_timeout(info),
                ConnectorListenerType::OnSenderEmpty => l.on_sender_empty(info),
                ConnectorListenerType::OnSenderTimeout => l.on_sender_timeout(info),
                ConnectorListenerType::OnSenderError => l.on_sender_error(info),
                ConnectorListenerType::OnConnect => l.on_connect(info),
                ConnectorListenerType::OnDisconnect => l.on_disconnect(info),
            }
        }
    }
}

/// Handshake callbacks of a port.
///
/// `ret` carries the outcome of the phase that just ran.
#[allow(unused_variables)]
pub trait PortConnectListener: Send + Sync {
    fn on_notify_connect(&self, port_name: &str, profile: &ConnectorProfile) {}
    fn on_notify_disconnect(&self, port_name: &str, profile: &ConnectorProfile) {}
    fn on_unsubscribe_interfaces(&self, port_name: &str, profile: &ConnectorProfile) {}
    fn on_publish_interfaces(&self, port_name: &str, profile: &ConnectorProfile, ret: ReturnCode) {}
    fn on_connect_next(&self, port_name: &str, profile: &ConnectorProfile, ret: ReturnCode) {}
    fn on_subscribe_interfaces(
        &self,
        port_name: &str,
        profile: &ConnectorProfile,
        ret: ReturnCode,
    ) {
    }
    fn on_connected(&self, port_name: &str, profile: &ConnectorProfile, ret: ReturnCode) {}
    fn on_disconnect_next(&self, port_name: &str, profile: &ConnectorProfile, ret: ReturnCode) {}
    fn on_disconnected(&self, port_name: &str, profile: &ConnectorProfile, ret: ReturnCode) {}
    /// A connector of this port reported `CONNECTION_LOST`. The connector
    /// stays registered until it is disconnected.
    fn on_connection_lost(&self, port_name: &str, profile: &ConnectorProfile) {}
}

#[derive(Default)]
pub(crate) struct PortConnectListeners {
    listeners: ArcSwap<Vec<Arc<dyn PortConnectListener>>>,
}

impl PortConnectListeners {
    pub(crate) fn add(&self, listener: Arc<dyn PortConnectListener>) {
        self.listeners.rcu(|cur| {
            let mut next = Vec::clone(cur);
            next.push(listener.clone());
            next
        });
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn PortConnectListener>) -> bool {
        let before = self.listeners.load().len();
        self.listeners.rcu(|cur| {
            cur.iter()
                .filter(|l| !Arc::ptr_eq(l, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
        self.listeners.load().len() != before
    }

    pub(crate) fn each<F: Fn(&dyn PortConnectListener)>(&self, f: F) {
        for l in self.listeners.load().iter() {
            f(l.as_ref());
        }
    }
}
