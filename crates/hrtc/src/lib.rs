// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HRTC - RT-Component runtime
//!
//! Lifecycle-managed components exchanging typed data through ports, driven by
//! execution contexts and hosted by a manager.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hrtc::{ComponentBehavior, Manager, OutPort, Properties, RtcResult, TimedDouble};
//! use std::sync::Arc;
//!
//! struct Counter {
//!     out: Arc<OutPort<TimedDouble>>,
//!     n: f64,
//! }
//!
//! impl ComponentBehavior for Counter {
//!     fn on_execute(&mut self, _ec_id: u32) -> RtcResult<()> {
//!         self.n += 1.0;
//!         self.out.write(&TimedDouble::now(self.n));
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> RtcResult<()> {
//!     let mgr = Manager::init(std::env::args())?;
//!     mgr.set_module_init_proc(|m| {
//!         m.register_factory(
//!             Properties::from_pairs(&[("type_name", "Counter")]),
//!             Arc::new(|comp: &Arc<hrtc::RtObject>| {
//!                 let out = OutPort::<TimedDouble>::new("out");
//!                 comp.add_port(out.clone())?;
//!                 Ok(Box::new(Counter { out, n: 0.0 }) as Box<dyn ComponentBehavior>)
//!             }),
//!             None,
//!         )
//!     });
//!     mgr.activate_manager()?;
//!     mgr.create_component("Counter")?;
//!     mgr.run_manager(true)?;
//!     mgr.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Manager: configuration, factories, modules, naming, timer          |
//! +---------------------------------------------------------------------+
//! |  RtObject: ports, ConfigAdmin, SDO | ExecutionContext + state FSM   |
//! +---------------------------------------------------------------------+
//! |  Ports: connection handshake, connectors, service ports             |
//! +---------------------------------------------------------------------+
//! |  Transport: buffers, publishers, providers/consumers, CDR, broker   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`manager`] - runtime entry point (start here)
//! - [`rtc`] - component object and lifecycle
//! - [`ec`] - execution contexts
//! - [`port`] - data and service ports
//! - [`buffer`], [`cdr`] - transport internals

/// Connector buffers (ring buffer and its policies).
pub mod buffer;
/// In-process object broker and event loop.
pub mod broker;
/// CDR encoding of port payloads and the timed data types.
pub mod cdr;
/// Configuration sets and parameter binding.
pub mod config_admin;
/// Execution contexts (periodic and externally triggered).
pub mod ec;
/// Error type and status codes.
pub mod error;
/// Runtime logging backend for the `log` facade.
pub mod logging;
/// Component manager.
pub mod manager;
/// Ports, connectors and the connection handshake.
pub mod port;
/// Hierarchical string properties.
pub mod properties;
/// Component object, behavior trait and lifecycle state machine.
pub mod rtc;
/// SDO management surface.
pub mod sdo;
/// Worker-thread scheduler.
pub mod task;

pub use broker::{ObjectBroker, ObjectId};
pub use buffer::{Buffer, BufferConfig, BufferStatus, RingBuffer};
pub use cdr::{
    ByteData, CdrData, Endian, Time, TimedBoolean, TimedDouble, TimedDoubleSeq, TimedFloat,
    TimedLong, TimedLongSeq, TimedOctet, TimedOctetSeq, TimedShort, TimedString, TimedULong,
};
pub use config_admin::{ConfigAdmin, ConfigParam, ConfigurationListener};
pub use ec::{
    ExecutionContext, ExecutionContextProfile, ExecutionKind, ExtTrigExecutionContext,
    PeriodicExecutionContext,
};
pub use error::{ReturnCode, RtcError, RtcResult};
pub use manager::{Manager, ManagerOptions};
pub use port::{
    connect_ports, ConnectorProfile, DataPortStatus, InPort, OutPort, PortService, ServiceConsumer,
    ServicePort,
};
pub use properties::Properties;
pub use rtc::{ComponentBehavior, ComponentProfile, ExecContextHandle, LifeCycleState, RtObject};
pub use sdo::{DependencyType, DeviceProfile, Organization, ServiceProfile};

/// HRTC version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
