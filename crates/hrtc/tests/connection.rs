// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::items_after_statements)] // Test helpers

//! Connection handshake across data and custom ports
//!
//! Covers profile symmetry between participants, rollback when a port in
//! the chain refuses the connection, and listener ordering.

use hrtc::error::ReturnCode;
use hrtc::port::{Port, PortBase, PortConnectListener, INPORT_REF_KEY};
use hrtc::{
    connect_ports, ConnectorProfile, DataPortStatus, InPort, ObjectBroker, OutPort, PortService,
    RtcError, RtcResult, TimedDouble, TimedLong,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Port that accepts publish but refuses subscribe.
struct RefusingPort {
    base: PortBase,
}

impl RefusingPort {
    fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn PortService> = weak.clone();
            Self {
                base: PortBase::new(name, this),
            }
        })
    }
}

impl Port for RefusingPort {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, _profile: &mut ConnectorProfile) -> RtcResult<()> {
        Ok(())
    }

    fn subscribe_interfaces(&self, _profile: &ConnectorProfile) -> RtcResult<()> {
        Err(RtcError::bad_param("refused"))
    }

    fn unsubscribe_interfaces(&self, _profile: &ConnectorProfile) {}
}

#[derive(Default)]
struct Trace(Mutex<Vec<String>>);

impl PortConnectListener for Trace {
    fn on_notify_connect(&self, port_name: &str, _profile: &ConnectorProfile) {
        self.0.lock().push(format!("notify_connect {}", port_name));
    }
    fn on_connected(&self, port_name: &str, _profile: &ConnectorProfile, ret: ReturnCode) {
        self.0.lock().push(format!("connected {} {:?}", port_name, ret));
    }
    fn on_disconnected(&self, port_name: &str, _profile: &ConnectorProfile, _ret: ReturnCode) {
        self.0.lock().push(format!("disconnected {}", port_name));
    }
}

fn data_ports(broker: &Arc<ObjectBroker>) -> (Arc<OutPort<TimedLong>>, Arc<InPort<TimedLong>>) {
    let out = OutPort::<TimedLong>::new("out");
    let inp = InPort::<TimedLong>::new("in");
    out.attach("src0", broker.clone());
    inp.attach("dst0", broker.clone());
    (out, inp)
}

#[test]
fn test_profiles_are_symmetric() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let a: Arc<dyn PortService> = out.clone();
    let b: Arc<dyn PortService> = inp.clone();

    let profile = connect_ports("link", &[&a, &b], &[("dataflow_type", "push")]).expect("connect");
    assert!(!profile.connector_id.is_empty());
    assert!(!profile.properties.get_property(INPORT_REF_KEY).is_empty());
    assert_eq!(profile.properties.get_property("data_type"), "IDL:RTC/TimedLong:1.0");

    let on_out = a.get_connector_profile(&profile.connector_id).expect("out profile");
    let on_in = b.get_connector_profile(&profile.connector_id).expect("in profile");
    assert_eq!(on_out, on_in);
    assert_eq!(on_out.ports.len(), 2);
    assert_eq!(a.name(), "src0.out");
    assert_eq!(b.get_port_profile().owner, "dst0");

    b.disconnect(&profile.connector_id).expect("disconnect");
    assert!(a.get_connector_profiles().is_empty());
    assert!(b.get_connector_profiles().is_empty());
    assert!(out.connector_ids().is_empty());
    assert_eq!(inp.read(), Err(DataPortStatus::PreconditionNotMet));
    assert!(b.disconnect(&profile.connector_id).is_err());
}

#[test]
fn test_refused_subscribe_rolls_back_every_port() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let third = RefusingPort::new("audit");
    third.attach("audit0", broker.clone());
    let a: Arc<dyn PortService> = out.clone();
    let b: Arc<dyn PortService> = inp.clone();
    let c: Arc<dyn PortService> = third;

    let refs = vec![a.port_ref(), b.port_ref(), c.port_ref()];
    let mut profile = ConnectorProfile::new("fan", refs).with_property("dataflow_type", "push");
    let res = a.connect(&mut profile);
    assert!(matches!(res, Err(RtcError::BadParameter(_))));
    assert!(!profile.connector_id.is_empty());

    for port in [&a, &b, &c] {
        assert!(port.get_connector_profile(&profile.connector_id).is_none());
    }
    assert!(out.connector_ids().is_empty());
    assert!(inp.connector_ids().is_empty());
    assert_eq!(broker.servant_count(), 0);
}

#[test]
fn test_type_mismatch_refused() {
    let broker = ObjectBroker::new();
    let out = OutPort::<TimedLong>::new("out");
    let inp = InPort::<TimedDouble>::new("in");
    out.attach("src0", broker.clone());
    inp.attach("dst0", broker.clone());
    let a: Arc<dyn PortService> = out;
    let b: Arc<dyn PortService> = inp;

    let res = connect_ports("bad", &[&a, &b], &[]);
    assert!(matches!(res, Err(RtcError::BadParameter(_))));
    assert!(a.get_connector_profiles().is_empty());
    assert!(b.get_connector_profiles().is_empty());
}

#[test]
fn test_unknown_interface_type_refused() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let a: Arc<dyn PortService> = out;
    let b: Arc<dyn PortService> = inp;
    let res = connect_ports("shm", &[&a, &b], &[("interface_type", "shared_memory")]);
    assert!(res.is_err());
    assert!(a.get_connector_profiles().is_empty());
}

#[test]
fn test_explicit_connector_id_must_be_unused() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let a: Arc<dyn PortService> = out;
    let b: Arc<dyn PortService> = inp;

    let mut first = ConnectorProfile::new("one", vec![a.port_ref(), b.port_ref()]);
    first.connector_id = "fixed-id".to_string();
    a.connect(&mut first).expect("connect");
    assert_eq!(first.connector_id, "fixed-id");

    let mut second = ConnectorProfile::new("two", vec![a.port_ref(), b.port_ref()]);
    second.connector_id = "fixed-id".to_string();
    assert!(matches!(a.connect(&mut second), Err(RtcError::PreconditionNotMet(_))));
    assert_eq!(a.get_connector_profiles().len(), 1);

    a.disconnect_all().expect("disconnect all");
    assert!(b.get_connector_profiles().is_empty());
}

#[test]
fn test_listeners_follow_handshake_order() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let a: Arc<dyn PortService> = out;
    let b: Arc<dyn PortService> = inp;
    let trace = Arc::new(Trace::default());
    a.add_connect_listener(trace.clone());
    b.add_connect_listener(trace.clone());

    let profile = connect_ports("link", &[&a, &b], &[]).expect("connect");
    a.disconnect(&profile.connector_id).expect("disconnect");

    assert_eq!(
        *trace.0.lock(),
        vec![
            "notify_connect src0.out",
            "notify_connect dst0.in",
            "connected dst0.in Ok",
            "connected src0.out Ok",
            "disconnected dst0.in",
            "disconnected src0.out",
        ]
    );

    let listener: Arc<dyn PortConnectListener> = trace.clone();
    assert!(a.remove_connect_listener(&listener));
    assert!(!a.remove_connect_listener(&listener));
}

#[test]
fn test_dropped_peer_reports_connection_lost() {
    let broker = ObjectBroker::new();
    let (out, inp) = data_ports(&broker);
    let a: Arc<dyn PortService> = out.clone();
    let b: Arc<dyn PortService> = inp.clone();
    let profile = connect_ports(
        "gone",
        &[&a, &b],
        &[("dataflow_type", "push"), ("subscription_type", "flush")],
    )
    .expect("connect");
    assert_eq!(out.write(&TimedLong::now(1)), DataPortStatus::PortOk);
    assert_eq!(broker.servant_count(), 1);

    drop(b);
    drop(inp);
    assert_eq!(broker.servant_count(), 0);

    for n in 2..5 {
        assert_eq!(out.write(&TimedLong::now(n)), DataPortStatus::ConnectionLost);
    }
    assert_eq!(out.connector_ids(), vec![profile.connector_id.clone()]);
    a.disconnect(&profile.connector_id).expect("disconnect");
    assert!(out.connector_ids().is_empty());
}
