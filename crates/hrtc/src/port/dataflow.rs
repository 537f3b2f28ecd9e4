// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buffer access with listener notification, shared by providers, consumers,
//! publishers and connectors.

use super::listener::{ConnectorDataListenerType as D, ConnectorListenerType as C};
use super::{ConnectorInfo, ConnectorListeners, ConnectorProfile, DataPortStatus, CDR_INTERFACE};
use crate::buffer::{Buffer, BufferStatus};
use crate::cdr::ByteData;
use crate::error::{RtcError, RtcResult};

/// `dataflow_type` of a data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataflowType {
    Push,
    Pull,
}

/// Validate the dataflow keys of `profile` for a port carrying `type_name`.
///
/// Fills in `data_type` when the profile does not name one yet, so the next
/// port in the chain checks against it.
pub(crate) fn check_profile(
    profile: &mut ConnectorProfile,
    type_name: &str,
) -> RtcResult<DataflowType> {
    let prop = &mut profile.properties;
    let flow = match prop.get_property("dataflow_type").trim() {
        "" | "push" => DataflowType::Push,
        "pull" => DataflowType::Pull,
        other => return Err(RtcError::bad_param(format!("unsupported dataflow_type '{}'", other))),
    };
    let iface = prop.get_property("interface_type").trim().to_string();
    if !iface.is_empty() && iface != CDR_INTERFACE {
        return Err(RtcError::bad_param(format!("unsupported interface_type '{}'", iface)));
    }
    let data_type = prop.get_property("data_type").trim().to_string();
    if data_type.is_empty() {
        prop.set_property("data_type", type_name);
    } else if data_type != type_name {
        return Err(RtcError::bad_param(format!(
            "data_type mismatch: connector carries {}, port expects {}",
            data_type, type_name
        )));
    }
    Ok(flow)
}

/// Read-only variant of [`check_profile`] used by the subscribe phase.
pub(crate) fn dataflow_of(profile: &ConnectorProfile) -> DataflowType {
    if profile.properties.get_property("dataflow_type").trim() == "pull" {
        DataflowType::Pull
    } else {
        DataflowType::Push
    }
}

/// Store `data`, firing the buffer write/overwrite/full/timeout events.
pub(crate) fn store(
    buffer: &dyn Buffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
    data: &ByteData,
) -> BufferStatus {
    if buffer.full() && buffer.overwrites() {
        listeners.notify_data(D::OnBufferOverwrite, info, data);
    }
    let status = buffer.write(data.clone());
    match status {
        BufferStatus::Ok => listeners.notify_data(D::OnBufferWrite, info, data),
        BufferStatus::Full => listeners.notify_data(D::OnBufferFull, info, data),
        BufferStatus::Timeout => listeners.notify_data(D::OnBufferWriteTimeout, info, data),
        _ => {}
    }
    status
}

/// Take the next entry for local consumption, firing read/empty/timeout events.
pub(crate) fn take(
    buffer: &dyn Buffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
) -> Result<ByteData, DataPortStatus> {
    match buffer.read() {
        Ok(data) => {
            listeners.notify_data(D::OnBufferRead, info, &data);
            Ok(data)
        }
        Err(BufferStatus::Empty) => {
            listeners.notify(C::OnBufferEmpty, info);
            Err(DataPortStatus::BufferEmpty)
        }
        Err(BufferStatus::Timeout) => {
            listeners.notify(C::OnBufferReadTimeout, info);
            Err(DataPortStatus::BufferTimeout)
        }
        Err(BufferStatus::PreconditionNotMet) => Err(DataPortStatus::PreconditionNotMet),
        Err(_) => Err(DataPortStatus::BufferError),
    }
}

/// Map a buffer write status onto the producer-side port status.
pub(crate) fn write_status(status: BufferStatus) -> DataPortStatus {
    match status {
        BufferStatus::Ok => DataPortStatus::PortOk,
        BufferStatus::Full => DataPortStatus::BufferFull,
        BufferStatus::Timeout => DataPortStatus::BufferTimeout,
        BufferStatus::Empty => DataPortStatus::BufferEmpty,
        BufferStatus::PreconditionNotMet => DataPortStatus::PreconditionNotMet,
        BufferStatus::Error => DataPortStatus::BufferError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferConfig, FullPolicy, RingBuffer};
    use crate::cdr::Endian;
    use crate::port::ConnectorDataListener;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Events(Mutex<Vec<&'static str>>);

    impl ConnectorDataListener for Events {
        fn on_buffer_write(&self, _i: &ConnectorInfo, _d: &ByteData) {
            self.0.lock().push("write");
        }
        fn on_buffer_overwrite(&self, _i: &ConnectorInfo, _d: &ByteData) {
            self.0.lock().push("overwrite");
        }
        fn on_buffer_full(&self, _i: &ConnectorInfo, _d: &ByteData) {
            self.0.lock().push("full");
        }
    }

    #[test]
    fn test_store_fires_overwrite_then_write() {
        let buffer = RingBuffer::new(BufferConfig {
            length: 1,
            ..BufferConfig::default()
        });
        let listeners = ConnectorListeners::new();
        let events = Arc::new(Events::default());
        listeners.add_data_listener(events.clone());
        let info = ConnectorInfo::default();
        let data = ByteData::new(vec![1u8], Endian::Little);

        assert_eq!(store(&buffer, &listeners, &info, &data), BufferStatus::Ok);
        assert_eq!(store(&buffer, &listeners, &info, &data), BufferStatus::Ok);
        assert_eq!(*events.0.lock(), vec!["write", "overwrite", "write"]);
    }

    #[test]
    fn test_check_profile_sets_and_checks_data_type() {
        let mut profile = ConnectorProfile::new("c", Vec::new());
        assert!(matches!(check_profile(&mut profile, "double"), Ok(DataflowType::Push)));
        assert_eq!(profile.properties.get_property("data_type"), "double");
        assert!(matches!(
            check_profile(&mut profile, "long"),
            Err(RtcError::BadParameter(_))
        ));

        let mut pull =
            ConnectorProfile::new("c", Vec::new()).with_property("dataflow_type", "pull");
        assert!(matches!(check_profile(&mut pull, "long"), Ok(DataflowType::Pull)));
        assert_eq!(dataflow_of(&pull), DataflowType::Pull);

        let mut bad =
            ConnectorProfile::new("c", Vec::new()).with_property("dataflow_type", "duplex");
        assert!(check_profile(&mut bad, "long").is_err());
    }

    #[test]
    fn test_store_full_maps_to_buffer_full() {
        let buffer = RingBuffer::new(BufferConfig {
            length: 1,
            full_policy: FullPolicy::DoNothing,
            ..BufferConfig::default()
        });
        let listeners = ConnectorListeners::new();
        let info = ConnectorInfo::default();
        let data = ByteData::default();
        store(&buffer, &listeners, &info, &data);
        let status = store(&buffer, &listeners, &info, &data);
        assert_eq!(write_status(status), DataPortStatus::BufferFull);
    }
}
