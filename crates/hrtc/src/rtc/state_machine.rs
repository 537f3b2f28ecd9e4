// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lifecycle state machine of one component within one execution context.

use super::fsm::{StateActions, StateHolder, StateMachine};
use super::{ExecContextHandle, LifeCycleState, RtObject};
use crate::error::{RtcError, RtcResult};
use std::sync::Arc;
use std::time::Duration;

/// Drives the lifecycle callbacks of `comp` for the context `ec_id`.
pub struct ComponentStateMachine {
    ec_id: ExecContextHandle,
    comp: Arc<RtObject>,
    sm: StateMachine<LifeCycleState>,
}

impl ComponentStateMachine {
    pub fn new(ec_id: ExecContextHandle, comp: Arc<RtObject>) -> Self {
        Self {
            ec_id,
            comp,
            sm: StateMachine::new(LifeCycleState::Inactive),
        }
    }

    pub fn ec_id(&self) -> ExecContextHandle {
        self.ec_id
    }

    pub fn component(&self) -> &Arc<RtObject> {
        &self.comp
    }

    pub fn is(&self, comp: &RtObject) -> bool {
        self.comp.id() == comp.id()
    }

    pub fn state(&self) -> LifeCycleState {
        self.sm.current()
    }

    pub fn states(&self) -> StateHolder<LifeCycleState> {
        self.sm.states()
    }

    pub fn is_current_state(&self, state: LifeCycleState) -> bool {
        self.sm.is_in(state)
    }

    pub fn is_next_state(&self, state: LifeCycleState) -> bool {
        self.sm.states().next == state
    }

    fn request(&self, from: LifeCycleState, to: LifeCycleState) -> RtcResult<()> {
        if let Err(st) = self.sm.go_to_from(from, to) {
            return Err(RtcError::precondition(format!(
                "{} is {} (next {}) in context {}, expected {}",
                self.comp.instance_name(),
                st.curr,
                st.next,
                self.ec_id,
                from
            )));
        }
        log::debug!(
            "[ComponentStateMachine] {} {} -> {} requested (ec {})",
            self.comp.instance_name(),
            from,
            to,
            self.ec_id
        );
        Ok(())
    }

    /// Inactive -> Active.
    pub fn activate(&self) -> RtcResult<()> {
        self.request(LifeCycleState::Inactive, LifeCycleState::Active)
    }

    /// Active -> Inactive.
    pub fn deactivate(&self) -> RtcResult<()> {
        self.request(LifeCycleState::Active, LifeCycleState::Inactive)
    }

    /// Error -> Inactive, subject to `on_reset`.
    pub fn reset(&self) -> RtcResult<()> {
        self.request(LifeCycleState::Error, LifeCycleState::Inactive)
    }

    /// Wait until no transition is pending and the current state is `state`.
    pub fn wait_for(&self, state: LifeCycleState, timeout: Duration) -> bool {
        self.sm
            .wait_until(timeout, |st| st.curr == st.next && st.curr == state)
    }

    /// Wait until the pending transition has been processed.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        self.sm.wait_until(timeout, |st| st.curr == st.next)
    }

    /// One scheduler step.
    pub fn work(&self) {
        self.sm.worker(self);
    }

    pub fn on_startup(&self) {
        if let Err(e) = self.comp.on_startup(self.ec_id) {
            log::warn!("[ComponentStateMachine] {} on_startup: {}", self.comp.instance_name(), e);
        }
    }

    pub fn on_shutdown(&self) {
        if let Err(e) = self.comp.on_shutdown(self.ec_id) {
            log::warn!("[ComponentStateMachine] {} on_shutdown: {}", self.comp.instance_name(), e);
        }
    }

    pub fn on_rate_changed(&self) {
        if let Err(e) = self.comp.on_rate_changed(self.ec_id) {
            log::warn!(
                "[ComponentStateMachine] {} on_rate_changed: {}",
                self.comp.instance_name(),
                e
            );
        }
    }

    fn fail(&self, what: &str, err: RtcError) {
        log::warn!(
            "[ComponentStateMachine] {} {} failed in context {}: {}",
            self.comp.instance_name(),
            what,
            self.ec_id,
            err
        );
        self.sm.go_to(LifeCycleState::Error);
    }
}

impl StateActions<LifeCycleState> for ComponentStateMachine {
    fn entry(&self, st: &StateHolder<LifeCycleState>) {
        match st.curr {
            LifeCycleState::Active => {
                if let Err(e) = self.comp.on_activated(self.ec_id) {
                    self.fail("on_activated", e);
                }
            }
            LifeCycleState::Error => {
                if let Err(e) = self.comp.on_aborting(self.ec_id) {
                    log::warn!(
                        "[ComponentStateMachine] {} on_aborting: {}",
                        self.comp.instance_name(),
                        e
                    );
                }
            }
            LifeCycleState::Inactive | LifeCycleState::Created => {}
        }
    }

    fn do_action(&self, st: &StateHolder<LifeCycleState>) {
        match st.curr {
            LifeCycleState::Active => {
                if let Err(e) = self.comp.on_execute(self.ec_id) {
                    self.fail("on_execute", e);
                }
            }
            LifeCycleState::Error => {
                if let Err(e) = self.comp.on_error(self.ec_id) {
                    log::debug!(
                        "[ComponentStateMachine] {} on_error: {}",
                        self.comp.instance_name(),
                        e
                    );
                }
            }
            LifeCycleState::Inactive | LifeCycleState::Created => {}
        }
    }

    fn post_do(&self, st: &StateHolder<LifeCycleState>) {
        if st.curr == LifeCycleState::Active {
            if let Err(e) = self.comp.on_state_update(self.ec_id) {
                self.fail("on_state_update", e);
            }
        }
    }

    fn exit(&self, st: &StateHolder<LifeCycleState>) {
        match (st.curr, st.next) {
            // Aborting replaces deactivation on the way to Error.
            (LifeCycleState::Active, LifeCycleState::Error) => {}
            (LifeCycleState::Active, _) => {
                if let Err(e) = self.comp.on_deactivated(self.ec_id) {
                    log::warn!(
                        "[ComponentStateMachine] {} on_deactivated: {}",
                        self.comp.instance_name(),
                        e
                    );
                }
            }
            (LifeCycleState::Error, _) => {
                if let Err(e) = self.comp.on_reset(self.ec_id) {
                    log::warn!(
                        "[ComponentStateMachine] {} on_reset failed, staying in error: {}",
                        self.comp.instance_name(),
                        e
                    );
                    self.sm.go_to(LifeCycleState::Error);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ObjectBroker;
    use crate::properties::Properties;
    use crate::rtc::ComponentBehavior;

    struct FailingExecute;

    impl ComponentBehavior for FailingExecute {
        fn on_execute(&mut self, _ec_id: ExecContextHandle) -> RtcResult<()> {
            Err(RtcError::Error)
        }
    }

    #[test]
    fn test_deactivate_does_not_override_pending_error() {
        let comp = RtObject::new(
            ObjectBroker::new(),
            Properties::from_pairs(&[("instance_name", "c0")]),
        );
        comp.set_behavior(Box::new(FailingExecute));
        let sm = ComponentStateMachine::new(0, comp);
        sm.activate().expect("activate");
        sm.work();
        assert_eq!(sm.state(), LifeCycleState::Active);

        sm.work();
        assert!(sm.is_next_state(LifeCycleState::Error));
        assert!(matches!(sm.deactivate(), Err(RtcError::PreconditionNotMet(_))));
        sm.work();
        assert_eq!(sm.state(), LifeCycleState::Error);
    }
}
