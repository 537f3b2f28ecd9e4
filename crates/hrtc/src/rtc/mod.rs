// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RT-Components: lifecycle callbacks, per-context state machines and the
//! component object.
//!
//! Component authors implement [`ComponentBehavior`]; the runtime wraps it in
//! an [`RtObject`] that owns ports, configuration and SDO state. Each execution
//! context the component participates in drives its own
//! [`ComponentStateMachine`]:
//!
//! ```text
//!              activate                     on_execute fails
//!   Inactive ------------> Active ------------------------------> Error
//!      ^  <------------     |  entry: on_activated                 |  entry: on_aborting
//!      |    deactivate      |  do:    on_execute, on_state_update  |  do:    on_error
//!      |                    |  exit:  on_deactivated               |  exit:  on_reset
//!      +---------------------------------------------------------- +
//!                               reset (on_reset ok)
//! ```

mod fsm;
mod object;
mod state_machine;

pub use fsm::{StateActions, StateHolder, StateMachine};
pub use object::RtObject;
pub use state_machine::ComponentStateMachine;

use crate::error::RtcResult;
use crate::port::PortProfile;
use crate::properties::Properties;
use std::fmt;

/// Identifier of an execution context as seen by one component.
///
/// Owned contexts are numbered from 0, participating ones from
/// [`ECOTHER_OFFSET`].
pub type ExecContextHandle = u32;

pub const ECOTHER_OFFSET: ExecContextHandle = 1000;

/// Observable state of a component within one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifeCycleState {
    Created,
    Inactive,
    Active,
    Error,
}

impl LifeCycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callbacks a component implementation may override.
///
/// Every method defaults to success. A callback returning an error (or
/// panicking) while the component is active moves it to
/// [`LifeCycleState::Error`].
#[allow(unused_variables)]
pub trait ComponentBehavior: Send {
    fn on_initialize(&mut self) -> RtcResult<()> {
        Ok(())
    }

    fn on_finalize(&mut self) -> RtcResult<()> {
        Ok(())
    }

    fn on_startup(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_shutdown(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_activated(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_deactivated(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_aborting(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_error(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    /// Leaving the error state. Failure keeps the component in error.
    fn on_reset(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_execute(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_state_update(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }

    fn on_rate_changed(&mut self, ec_id: ExecContextHandle) -> RtcResult<()> {
        Ok(())
    }
}

/// Behavior with every callback left at its default.
pub struct NoBehavior;

impl ComponentBehavior for NoBehavior {}

/// Snapshot of a component's descriptive data.
#[derive(Debug, Clone)]
pub struct ComponentProfile {
    pub instance_name: String,
    pub type_name: String,
    pub description: String,
    pub version: String,
    pub vendor: String,
    pub category: String,
    pub port_profiles: Vec<PortProfile>,
    /// Ids of the organizations the component participates in.
    pub organizations: Vec<String>,
    pub properties: Properties,
}
