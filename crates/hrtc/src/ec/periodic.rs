// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context ticking on a dedicated worker thread.

use super::{ExecutionContext, ExecutionContextBase, ExecutionKind};
use crate::error::RtcResult;
use crate::properties::Properties;
use crate::task::{PeriodicTask, TaskControl, TaskMode};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

pub struct PeriodicExecutionContext {
    base: ExecutionContextBase,
    task: Mutex<Option<PeriodicTask>>,
}

impl PeriodicExecutionContext {
    pub fn new(props: &Properties) -> RtcResult<Arc<Self>> {
        let rate = ExecutionContextBase::configured_rate(props)?;
        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn ExecutionContext> = weak.clone();
            Self {
                base: ExecutionContextBase::new(ExecutionKind::Periodic, rate, props, this),
                task: Mutex::new(None),
            }
        }))
    }

    /// Context running at `rate` Hz with default settings.
    pub fn with_rate(rate: f64) -> RtcResult<Arc<Self>> {
        Self::new(&Properties::from_pairs(&[("rate", rate.to_string())]))
    }
}

impl ExecutionContext for PeriodicExecutionContext {
    fn base(&self) -> &ExecutionContextBase {
        &self.base
    }

    fn start(&self) -> RtcResult<()> {
        self.base.begin_start()?;
        let worker = self.base.worker().clone();
        let spawned = PeriodicTask::spawn(
            &format!("ec-{}", self.base.id().as_u64()),
            TaskMode::Periodic(self.base.period()),
            move || {
                worker.invoke();
                TaskControl::Continue
            },
        );
        match spawned {
            Ok(task) => {
                *self.task.lock() = Some(task);
                Ok(())
            }
            Err(e) => {
                self.base.abort_start();
                Err(e)
            }
        }
    }

    fn stop(&self) -> RtcResult<()> {
        self.base.begin_stop()?;
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            task.stop();
        }
        self.base.notify_shutdown();
        Ok(())
    }

    fn set_rate(&self, rate: f64) -> RtcResult<()> {
        self.base.store_rate(rate)?;
        if let Some(task) = self.task.lock().as_ref() {
            task.set_period(self.base.period())?;
        }
        self.base.notify_rate_changed();
        Ok(())
    }

    fn in_worker_thread(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(PeriodicTask::is_worker_thread)
    }
}

impl Drop for PeriodicExecutionContext {
    fn drop(&mut self) {
        if let Some(mut task) = self.task.get_mut().take() {
            task.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ObjectBroker;
    use crate::error::RtcError;
    use crate::rtc::{ComponentBehavior, ExecContextHandle, LifeCycleState, RtObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Counts {
        startup: AtomicUsize,
        shutdown: AtomicUsize,
        execute: AtomicUsize,
        rate_changed: AtomicUsize,
    }

    struct Counting(Arc<Counts>);

    impl ComponentBehavior for Counting {
        fn on_startup(&mut self, _: ExecContextHandle) -> RtcResult<()> {
            self.0.startup.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_shutdown(&mut self, _: ExecContextHandle) -> RtcResult<()> {
            self.0.shutdown.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_execute(&mut self, _: ExecContextHandle) -> RtcResult<()> {
            self.0.execute.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_rate_changed(&mut self, _: ExecContextHandle) -> RtcResult<()> {
            self.0.rate_changed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn component(counts: &Arc<Counts>) -> Arc<RtObject> {
        let comp = RtObject::new(
            ObjectBroker::new(),
            Properties::from_pairs(&[("instance_name", "counter0")]),
        );
        comp.set_behavior(Box::new(Counting(counts.clone())));
        comp.initialize().expect("init");
        comp
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(matches!(
            PeriodicExecutionContext::with_rate(0.0),
            Err(RtcError::BadParameter(_))
        ));
        let ec = PeriodicExecutionContext::with_rate(10.0).expect("ec");
        assert!(matches!(ec.set_rate(-1.0), Err(RtcError::BadParameter(_))));
        assert!(matches!(ec.set_rate(f64::NAN), Err(RtcError::BadParameter(_))));
        assert_eq!(ec.get_rate(), 10.0);
    }

    #[test]
    fn test_start_activate_execute_stop() {
        let counts = Arc::new(Counts::default());
        let comp = component(&counts);
        let ec = PeriodicExecutionContext::with_rate(200.0).expect("ec");
        ec.add_component(&comp).expect("add");
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);

        ec.start().expect("start");
        assert!(matches!(ec.start(), Err(RtcError::PreconditionNotMet(_))));
        assert_eq!(counts.startup.load(Ordering::SeqCst), 1);

        ec.activate_component(&comp).expect("activate");
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
        let deadline = Instant::now() + Duration::from_secs(2);
        while counts.execute.load(Ordering::SeqCst) < 5 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(counts.execute.load(Ordering::SeqCst) >= 5);

        ec.set_rate(100.0).expect("rate");
        assert_eq!(counts.rate_changed.load(Ordering::SeqCst), 1);

        ec.deactivate_component(&comp).expect("deactivate");
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert!(matches!(
            ec.reset_component(&comp),
            Err(RtcError::PreconditionNotMet(_))
        ));

        ec.stop().expect("stop");
        assert!(!ec.is_running());
        assert_eq!(counts.shutdown.load(Ordering::SeqCst), 1);
        let executed = counts.execute.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(counts.execute.load(Ordering::SeqCst), executed);

        ec.remove_component(&comp).expect("remove");
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Created);
        assert!(comp.get_participating_contexts().is_empty());
    }

    #[test]
    fn test_duplicate_and_unknown_participants() {
        let counts = Arc::new(Counts::default());
        let comp = component(&counts);
        let ec = PeriodicExecutionContext::with_rate(50.0).expect("ec");
        ec.add_component(&comp).expect("add");
        assert!(matches!(ec.add_component(&comp), Err(RtcError::BadParameter(_))));
        let other = component(&counts);
        assert!(matches!(
            ec.activate_component(&other),
            Err(RtcError::BadParameter(_))
        ));
        assert!(matches!(ec.remove_component(&other), Err(RtcError::BadParameter(_))));
    }

    #[test]
    fn test_profile_lists_owner_and_participants() {
        let counts = Arc::new(Counts::default());
        let owner = component(&counts);
        let guest = component(&counts);
        guest.set_instance_name("guest0");
        let ec = PeriodicExecutionContext::with_rate(20.0).expect("ec");
        ec.bind_component(&owner).expect("bind");
        ec.add_component(&guest).expect("add");
        let profile = ec.get_profile();
        assert_eq!(profile.kind, ExecutionKind::Periodic);
        assert_eq!(profile.owner.as_deref(), Some("counter0"));
        assert_eq!(profile.participants, vec!["counter0".to_string(), "guest0".to_string()]);
        assert_eq!(owner.get_owned_contexts().len(), 1);
        assert_eq!(guest.get_context_handle(ec.as_ref()), Some(crate::rtc::ECOTHER_OFFSET));
        assert!(guest.is_alive(ec.as_ref()));
        ec.remove_component(&owner).expect("remove");
        ec.remove_component(&guest).expect("remove");
    }
}
