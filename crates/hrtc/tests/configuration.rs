// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::items_after_statements)] // Test helpers

//! Configuration sets loaded from component config files
//!
//! A component type config file provides extra `conf.<set>.*` sets; bound
//! parameters follow the active set once it is applied.

use hrtc::manager::ComponentCtor;
use hrtc::{
    ComponentBehavior, ConfigParam, ConfigurationListener, LifeCycleState, Manager, Properties,
    RtObject,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

struct Plain;

impl ComponentBehavior for Plain {}

#[derive(Default)]
struct Applied(Mutex<Vec<String>>);

impl ConfigurationListener for Applied {
    fn on_update(&self, set_id: &str) {
        self.0.lock().push(set_id.to_string());
    }
}

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(text.as_bytes()).expect("write");
    file.flush().expect("flush");
    file
}

fn manager_with_type_config(path: &str) -> Arc<Manager> {
    let type_config = format!("test.Gain.config_file:{}", path);
    let argv = vec![
        "rtcd",
        "-d",
        "-o",
        "logger.enable:NO",
        "-o",
        "timer.enable:NO",
        "-o",
        "exec_cxt.periodic.type:ExtTrigExecutionContext",
        "-o",
        type_config.as_str(),
    ];
    let mgr = Manager::init(argv).expect("init");
    mgr.activate_manager().expect("activate");
    mgr
}

fn register_gain(mgr: &Manager, gain: &ConfigParam<f64>) {
    let gain = gain.clone();
    let ctor: ComponentCtor = Arc::new(move |comp: &Arc<RtObject>| {
        comp.bind_parameter("gain", &gain, "1.0")?;
        Ok(Box::new(Plain) as Box<dyn ComponentBehavior>)
    });
    mgr.register_factory(
        Properties::from_pairs(&[("type_name", "Gain"), ("category", "test")]),
        ctor,
        None,
    )
    .expect("register");
}

#[test]
fn test_swap_between_sets() {
    let file = write_config("conf.fast.gain: 2.5\nconf.slow.gain: 0.25\n");
    let mgr = manager_with_type_config(&file.path().to_string_lossy());
    let gain = ConfigParam::new(0.0_f64);
    register_gain(&mgr, &gain);

    let comp = mgr.create_component("Gain").expect("create");
    assert_eq!(gain.get(), 1.0);
    let config = comp.config();
    assert!(config.have_config("fast"));
    assert!(config.have_config("slow"));
    assert_eq!(config.active_id(), "default");

    config.activate_configuration_set("fast").expect("activate fast");
    config.update();
    assert_eq!(gain.get(), 2.5);

    config.activate_configuration_set("default").expect("activate default");
    config.update();
    assert_eq!(gain.get(), 1.0);
    mgr.shutdown();
}

#[test]
fn test_initial_set_from_spec_parameters() {
    let file = write_config("conf.fast.gain: 2.5\n");
    let mgr = manager_with_type_config(&file.path().to_string_lossy());
    let gain = ConfigParam::new(0.0_f64);
    register_gain(&mgr, &gain);

    let comp = mgr
        .create_component("Gain?configuration.active_config=fast")
        .expect("create");
    assert_eq!(comp.config().active_id(), "fast");
    assert_eq!(gain.get(), 2.5);
    mgr.shutdown();
}

#[test]
fn test_activation_applies_pending_set_once() {
    let file = write_config("conf.fast.gain: 4.0\n");
    let mgr = manager_with_type_config(&file.path().to_string_lossy());
    let gain = ConfigParam::new(0.0_f64);
    register_gain(&mgr, &gain);

    let comp = mgr.create_component("Gain").expect("create");
    let applied = Arc::new(Applied::default());
    comp.config().add_listener(applied.clone());
    comp.config()
        .activate_configuration_set("fast")
        .expect("activate fast");
    assert_eq!(gain.get(), 1.0);

    let ec = mgr.get_component_context("Gain0").expect("context");
    ec.activate_component(&comp).expect("activate");
    ec.tick().expect("tick");
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
    assert_eq!(gain.get(), 4.0);

    for _ in 0..3 {
        ec.tick().expect("tick");
    }
    assert_eq!(*applied.0.lock(), vec!["fast".to_string()]);
    assert!(!comp.config().is_changed());
    mgr.shutdown();
}

#[test]
fn test_unparsable_value_leaves_variable() {
    let file = write_config("conf.broken.gain: fast\n");
    let mgr = manager_with_type_config(&file.path().to_string_lossy());
    let gain = ConfigParam::new(0.0_f64);
    register_gain(&mgr, &gain);

    let comp = mgr.create_component("Gain").expect("create");
    comp.config()
        .activate_configuration_set("broken")
        .expect("activate broken");
    comp.config().update();
    assert_eq!(gain.get(), 1.0);
    mgr.shutdown();
}
