// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Provider servants.
//!
//! A provider is registered with the broker and reached by the peer's
//! consumer through the object key published in the connector profile.
//! [`InPortCdrProvider`] accepts pushed payloads into the input connector's
//! buffer; [`OutPortCdrProvider`] serves pull requests from the output
//! connector's buffer.

use super::dataflow;
use super::listener::{ConnectorDataListenerType as D, ConnectorListenerType as C};
use super::{ConnectorInfo, ConnectorListeners, DataPortStatus};
use crate::buffer::{Buffer, BufferStatus};
use crate::cdr::ByteData;
use std::sync::Arc;

/// Receiving end of a push connection.
pub struct InPortCdrProvider {
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    info: ConnectorInfo,
}

impl InPortCdrProvider {
    pub fn new(
        buffer: Arc<dyn Buffer>,
        listeners: Arc<ConnectorListeners>,
        info: ConnectorInfo,
    ) -> Self {
        Self {
            buffer,
            listeners,
            info,
        }
    }

    /// Deposit one payload.
    pub fn put(&self, data: &ByteData) -> DataPortStatus {
        log::trace!("[InPortCdrProvider::put] {} bytes on {}", data.len(), self.info.id);
        self.listeners.notify_data(D::OnReceived, &self.info, data);
        let status = dataflow::store(self.buffer.as_ref(), &self.listeners, &self.info, data);
        match status {
            BufferStatus::Ok => DataPortStatus::PortOk,
            BufferStatus::Full => {
                self.listeners.notify_data(D::OnReceiverFull, &self.info, data);
                DataPortStatus::BufferFull
            }
            BufferStatus::Timeout => {
                self.listeners.notify_data(D::OnReceiverTimeout, &self.info, data);
                DataPortStatus::BufferTimeout
            }
            BufferStatus::PreconditionNotMet => {
                self.listeners.notify_data(D::OnReceiverError, &self.info, data);
                DataPortStatus::PreconditionNotMet
            }
            BufferStatus::Empty | BufferStatus::Error => {
                self.listeners.notify_data(D::OnReceiverError, &self.info, data);
                DataPortStatus::PortError
            }
        }
    }
}

/// Serving end of a pull connection.
pub struct OutPortCdrProvider {
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    info: ConnectorInfo,
}

impl OutPortCdrProvider {
    pub fn new(
        buffer: Arc<dyn Buffer>,
        listeners: Arc<ConnectorListeners>,
        info: ConnectorInfo,
    ) -> Self {
        Self {
            buffer,
            listeners,
            info,
        }
    }

    /// Hand out the oldest unread payload.
    pub fn get(&self) -> Result<ByteData, DataPortStatus> {
        match self.buffer.read() {
            Ok(data) => {
                self.listeners.notify_data(D::OnBufferRead, &self.info, &data);
                self.listeners.notify_data(D::OnSend, &self.info, &data);
                Ok(data)
            }
            Err(BufferStatus::Empty) => {
                self.listeners.notify(C::OnBufferEmpty, &self.info);
                self.listeners.notify(C::OnSenderEmpty, &self.info);
                Err(DataPortStatus::BufferEmpty)
            }
            Err(BufferStatus::Timeout) => {
                self.listeners.notify(C::OnBufferReadTimeout, &self.info);
                self.listeners.notify(C::OnSenderTimeout, &self.info);
                Err(DataPortStatus::BufferTimeout)
            }
            Err(BufferStatus::PreconditionNotMet) => {
                self.listeners.notify(C::OnSenderError, &self.info);
                Err(DataPortStatus::PreconditionNotMet)
            }
            Err(_) => {
                self.listeners.notify(C::OnSenderError, &self.info);
                Err(DataPortStatus::BufferError)
            }
        }
    }
}
