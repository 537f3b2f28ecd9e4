// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::items_after_statements)] // Test helpers

//! Component lifecycle driven by manager-created execution contexts
//!
//! Components are created through a registered factory; their contexts are
//! stepped explicitly (externally triggered) or run on their own thread
//! (periodic).

use hrtc::manager::ComponentCtor;
use hrtc::{
    ComponentBehavior, ExecContextHandle, LifeCycleState, Manager, Properties, RtObject, RtcError,
    RtcResult,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Callback log shared between a behavior and the test.
#[derive(Default)]
struct Journal {
    events: Mutex<Vec<&'static str>>,
    executes: Mutex<usize>,
}

impl Journal {
    fn push(&self, event: &'static str) {
        self.events.lock().push(event);
    }

    fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    fn executes(&self) -> usize {
        *self.executes.lock()
    }
}

struct Echo {
    journal: Arc<Journal>,
    fail_at: Option<usize>,
}

impl ComponentBehavior for Echo {
    fn on_initialize(&mut self) -> RtcResult<()> {
        self.journal.push("initialize");
        Ok(())
    }
    fn on_activated(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        self.journal.push("activated");
        Ok(())
    }
    fn on_deactivated(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        self.journal.push("deactivated");
        Ok(())
    }
    fn on_aborting(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        self.journal.push("aborting");
        Ok(())
    }
    fn on_error(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        self.journal.push("error");
        Ok(())
    }
    fn on_reset(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        self.journal.push("reset");
        Ok(())
    }
    fn on_execute(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        let mut n = self.journal.executes.lock();
        *n += 1;
        if self.fail_at == Some(*n) {
            return Err(RtcError::Error);
        }
        Ok(())
    }
    fn on_finalize(&mut self) -> RtcResult<()> {
        self.journal.push("finalize");
        Ok(())
    }
}

fn manager(ec_type: &str) -> Arc<Manager> {
    let ec_opt = format!("exec_cxt.periodic.type:{}", ec_type);
    let argv = vec![
        "rtcd",
        "-d",
        "-o",
        "logger.enable:NO",
        "-o",
        "timer.enable:NO",
        "-o",
        ec_opt.as_str(),
    ];
    let mgr = Manager::init(argv).expect("init");
    mgr.activate_manager().expect("activate");
    mgr
}

fn register_echo(mgr: &Manager, journal: &Arc<Journal>, fail_at: Option<usize>) {
    let journal = journal.clone();
    let ctor: ComponentCtor = Arc::new(move |_: &Arc<RtObject>| {
        Ok(Box::new(Echo {
            journal: journal.clone(),
            fail_at,
        }) as Box<dyn ComponentBehavior>)
    });
    mgr.register_factory(
        Properties::from_pairs(&[("type_name", "Echo"), ("category", "test")]),
        ctor,
        None,
    )
    .expect("register");
}

#[test]
fn test_activate_execute_deactivate() {
    let mgr = manager("ExtTrigExecutionContext");
    let journal = Arc::new(Journal::default());
    register_echo(&mgr, &journal, None);

    let comp = mgr.create_component("Echo").expect("create");
    assert_eq!(journal.count("initialize"), 1);
    let ec = mgr.get_component_context("Echo0").expect("context");
    assert!(ec.is_running());
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);

    ec.activate_component(&comp).expect("activate");
    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
    assert_eq!(journal.count("activated"), 1);
    assert_eq!(journal.executes(), 0);

    for expected in 1..=10 {
        ec.tick().expect("tick");
        assert_eq!(journal.executes(), expected);
    }

    ec.deactivate_component(&comp).expect("deactivate");
    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
    assert_eq!(journal.count("deactivated"), 1);
    assert_eq!(journal.executes(), 10);

    assert!(matches!(
        ec.reset_component(&comp),
        Err(RtcError::PreconditionNotMet(_))
    ));

    mgr.delete_component("Echo0").expect("delete");
    assert_eq!(journal.count("finalize"), 1);
    mgr.shutdown();
}

#[test]
fn test_error_on_fifth_execute_then_reset() {
    let mgr = manager("ExtTrigExecutionContext");
    let journal = Arc::new(Journal::default());
    register_echo(&mgr, &journal, Some(5));

    let comp = mgr.create_component("Echo").expect("create");
    let ec = mgr.get_component_context("Echo0").expect("context");
    ec.activate_component(&comp).expect("activate");
    ec.tick().expect("tick");

    for _ in 0..4 {
        ec.tick().expect("tick");
    }
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
    ec.tick().expect("tick");
    assert_eq!(journal.executes(), 5);

    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Error);
    assert_eq!(journal.count("aborting"), 1);
    assert_eq!(journal.count("deactivated"), 0);

    ec.tick().expect("tick");
    ec.tick().expect("tick");
    assert_eq!(journal.count("error"), 2);
    assert_eq!(journal.executes(), 5);
    {
        let events = journal.events.lock();
        let aborting = events.iter().position(|e| *e == "aborting");
        let error = events.iter().position(|e| *e == "error");
        assert!(aborting < error);
    }

    assert!(matches!(
        ec.deactivate_component(&comp),
        Err(RtcError::PreconditionNotMet(_))
    ));
    ec.reset_component(&comp).expect("reset");
    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
    assert_eq!(journal.count("reset"), 1);
    mgr.shutdown();
}

#[test]
fn test_finalize_refused_while_active() {
    let mgr = manager("ExtTrigExecutionContext");
    let journal = Arc::new(Journal::default());
    register_echo(&mgr, &journal, None);

    let comp = mgr.create_component("Echo").expect("create");
    let ec = mgr.get_component_context("Echo0").expect("context");
    ec.activate_component(&comp).expect("activate");
    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);

    assert!(matches!(comp.finalize(), Err(RtcError::PreconditionNotMet(_))));
    assert!(!comp.is_finalized());
    assert_eq!(journal.count("finalize"), 0);
    ec.tick().expect("tick");
    assert_eq!(journal.executes(), 1);

    mgr.delete_component("Echo0").expect("delete");
    assert!(comp.is_finalized());
    assert_eq!(journal.count("finalize"), 1);
    mgr.shutdown();
}

#[test]
fn test_periodic_context_runs_at_rate() {
    let mgr = manager("PeriodicExecutionContext");
    let journal = Arc::new(Journal::default());
    register_echo(&mgr, &journal, None);

    let comp = mgr
        .create_component("Echo?exec_cxt.periodic.rate=100")
        .expect("create");
    let ec = mgr.get_component_context("Echo0").expect("context");
    assert_eq!(ec.get_rate(), 100.0);

    ec.activate_component(&comp).expect("activate");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);

    let deadline = Instant::now() + Duration::from_secs(3);
    while journal.executes() < 10 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(journal.executes() >= 10);

    ec.deactivate_component(&comp).expect("deactivate");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
    let executed = journal.executes();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(journal.executes(), executed);

    mgr.shutdown();
    assert!(!ec.is_running());
    assert!(comp.is_finalized());
}
