// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution contexts: schedulers that drive component state machines.
//!
//! - [`PeriodicExecutionContext`] ticks on its own worker thread at a rate
//!   given in Hz.
//! - [`ExtTrigExecutionContext`] ticks only when [`ExecutionContext::tick`]
//!   is called, in the caller's thread.
//!
//! Both share [`ExecutionContextBase`]; the trait's provided methods
//! implement the component operations on top of it.

mod base;
mod ext_trig;
mod periodic;
mod worker;

pub use base::ExecutionContextBase;
pub use ext_trig::ExtTrigExecutionContext;
pub use periodic::PeriodicExecutionContext;
pub use worker::ExecutionContextWorker;

use crate::broker::ObjectId;
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use crate::rtc::{ComponentStateMachine, LifeCycleState, RtObject};
use std::fmt;
use std::sync::Arc;

/// Factory name of the periodic context.
pub const PERIODIC_EC: &str = "PeriodicExecutionContext";

/// Factory name of the externally triggered context.
pub const EXT_TRIG_EC: &str = "ExtTrigExecutionContext";

/// Default rate in Hz.
pub const DEFAULT_EC_RATE: f64 = 1000.0;

/// Scheduling discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Periodic,
    EventDriven,
    Other,
}

impl ExecutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Periodic => "PERIODIC",
            Self::EventDriven => "EVENT_DRIVEN",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an execution context.
#[derive(Debug, Clone)]
pub struct ExecutionContextProfile {
    pub kind: ExecutionKind,
    pub rate: f64,
    /// Instance name of the owning component, if bound.
    pub owner: Option<String>,
    /// Instance names of the participants.
    pub participants: Vec<String>,
    pub properties: Properties,
}

/// Operations of an execution context.
///
/// Concrete contexts supply [`base`](Self::base), [`start`](Self::start) and
/// [`stop`](Self::stop); the rest is provided.
pub trait ExecutionContext: Send + Sync {
    fn base(&self) -> &ExecutionContextBase;

    /// Fire `on_startup` on every participant, then begin ticking.
    fn start(&self) -> RtcResult<()>;

    /// Stop ticking (waiting for the in-flight tick), then fire `on_shutdown`.
    fn stop(&self) -> RtcResult<()>;

    fn set_rate(&self, rate: f64) -> RtcResult<()> {
        self.base().store_rate(rate)?;
        self.base().notify_rate_changed();
        Ok(())
    }

    /// Run one tick in the caller's thread.
    fn tick(&self) -> RtcResult<()> {
        Err(RtcError::Unsupported("tick on a self-scheduled context".into()))
    }

    /// True when called from this context's own worker thread.
    fn in_worker_thread(&self) -> bool {
        false
    }

    fn id(&self) -> ObjectId {
        self.base().id()
    }

    fn is_running(&self) -> bool {
        self.base().is_running()
    }

    fn get_rate(&self) -> f64 {
        self.base().rate()
    }

    fn get_kind(&self) -> ExecutionKind {
        self.base().kind()
    }

    fn get_profile(&self) -> ExecutionContextProfile {
        self.base().profile()
    }

    /// Make `comp` the owner of this context and a participant.
    fn bind_component(&self, comp: &Arc<RtObject>) -> RtcResult<()> {
        self.base().bind_component(comp)
    }

    /// Add `comp` as a participant (initially Inactive).
    fn add_component(&self, comp: &Arc<RtObject>) -> RtcResult<()> {
        self.base().add_component(comp)
    }

    fn remove_component(&self, comp: &RtObject) -> RtcResult<()> {
        self.base().remove_component(comp)
    }

    fn activate_component(&self, comp: &RtObject) -> RtcResult<()> {
        let sm = self.base().state_machine(comp)?;
        sm.activate()?;
        self.wait_transition(&sm, LifeCycleState::Active)
    }

    fn deactivate_component(&self, comp: &RtObject) -> RtcResult<()> {
        let sm = self.base().state_machine(comp)?;
        sm.deactivate()?;
        self.wait_transition(&sm, LifeCycleState::Inactive)
    }

    fn reset_component(&self, comp: &RtObject) -> RtcResult<()> {
        let sm = self.base().state_machine(comp)?;
        sm.reset()?;
        self.wait_transition(&sm, LifeCycleState::Inactive)
    }

    /// State of `comp`, or `Created` when it does not participate.
    fn get_component_state(&self, comp: &RtObject) -> LifeCycleState {
        self.base()
            .state_machine(comp)
            .map_or(LifeCycleState::Created, |sm| sm.state())
    }

    /// With synchronous transitions enabled, wait until the worker has
    /// processed the request and check that `target` was reached.
    fn wait_transition(&self, sm: &ComponentStateMachine, target: LifeCycleState) -> RtcResult<()> {
        let base = self.base();
        if !base.sync_transition() || !self.is_running() || self.in_worker_thread() {
            return Ok(());
        }
        if !sm.wait_settled(base.transition_timeout()) {
            log::warn!(
                "[ExecutionContext] {} did not reach {} in time",
                sm.component().instance_name(),
                target
            );
            return Err(RtcError::Timeout);
        }
        if sm.state() == target {
            Ok(())
        } else {
            Err(RtcError::Error)
        }
    }
}
