// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity

//! End-to-end dataflow between components
//!
//! Push (flush, periodic, new) and pull connections carrying `TimedLong`
//! samples between an `OutPort` and an `InPort` on separate components.

use hrtc::{
    connect_ports, ComponentBehavior, ExecContextHandle, ExecutionContext, ExtTrigExecutionContext,
    InPort, ObjectBroker, OutPort, PeriodicExecutionContext, PortService, Properties, RtObject,
    RtcError, RtcResult, TimedLong,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Writer {
    out: Arc<OutPort<TimedLong>>,
    written: Arc<AtomicI32>,
}

impl ComponentBehavior for Writer {
    fn on_execute(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        let n = self.written.fetch_add(1, Ordering::SeqCst) + 1;
        if self.out.write(&TimedLong::now(n)).is_ok() {
            Ok(())
        } else {
            Err(RtcError::Error)
        }
    }
}

struct Reader {
    inp: Arc<InPort<TimedLong>>,
    seen: Arc<Mutex<Vec<i32>>>,
}

impl ComponentBehavior for Reader {
    fn on_execute(&mut self, _: ExecContextHandle) -> RtcResult<()> {
        while let Ok(v) = self.inp.read() {
            self.seen.lock().push(v.data);
        }
        Ok(())
    }
}

struct Pair {
    writer: Arc<RtObject>,
    reader: Arc<RtObject>,
    out: Arc<OutPort<TimedLong>>,
    inp: Arc<InPort<TimedLong>>,
}

fn pair(broker: &Arc<ObjectBroker>) -> Pair {
    let writer = RtObject::new(
        broker.clone(),
        Properties::from_pairs(&[("instance_name", "writer0")]),
    );
    let reader = RtObject::new(
        broker.clone(),
        Properties::from_pairs(&[("instance_name", "reader0")]),
    );
    let out = OutPort::<TimedLong>::new("out");
    let inp = InPort::<TimedLong>::new("in");
    writer.add_port(out.clone()).expect("add out");
    reader.add_port(inp.clone()).expect("add in");
    Pair {
        writer,
        reader,
        out,
        inp,
    }
}

fn connect(pair: &Pair, props: &[(&str, &str)]) -> String {
    let a: Arc<dyn PortService> = pair.out.clone();
    let b: Arc<dyn PortService> = pair.inp.clone();
    let profile = connect_ports("writer0.out-reader0.in", &[&a, &b], props).expect("connect");
    profile.connector_id
}

fn drain(inp: &InPort<TimedLong>) -> Vec<i32> {
    let mut values = Vec::new();
    while let Ok(v) = inp.read() {
        values.push(v.data);
    }
    values
}

#[test]
fn test_flush_all_delivers_every_sample_in_order() {
    let broker = ObjectBroker::new();
    let pair = pair(&broker);
    connect(
        &pair,
        &[
            ("dataflow_type", "push"),
            ("interface_type", "corba_cdr"),
            ("subscription_type", "flush"),
            ("push_policy", "all"),
            ("buffer.length", "8"),
            ("buffer.read.empty_policy", "do_nothing"),
        ],
    );

    let written = Arc::new(AtomicI32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    pair.writer.set_behavior(Box::new(Writer {
        out: pair.out.clone(),
        written: written.clone(),
    }));
    pair.reader.set_behavior(Box::new(Reader {
        inp: pair.inp.clone(),
        seen: seen.clone(),
    }));
    pair.writer.initialize().expect("init writer");
    pair.reader.initialize().expect("init reader");

    let ec = ExtTrigExecutionContext::new(&Properties::new()).expect("ec");
    ec.add_component(&pair.writer).expect("add writer");
    ec.add_component(&pair.reader).expect("add reader");
    ec.start().expect("start");
    ec.activate_component(&pair.writer).expect("activate writer");
    ec.activate_component(&pair.reader).expect("activate reader");

    for _ in 0..40 {
        ec.tick().expect("tick");
    }
    ec.stop().expect("stop");

    let mut values = seen.lock().clone();
    values.extend(drain(&pair.inp));
    let total = written.load(Ordering::SeqCst);
    assert!(total >= 38, "writer ran {} times", total);
    assert_eq!(values, (1..=total).collect::<Vec<_>>());
}

#[test]
fn test_blocking_buffer_keeps_fast_writer_lossless() {
    let broker = ObjectBroker::new();
    let pair = pair(&broker);
    connect(
        &pair,
        &[
            ("dataflow_type", "push"),
            ("subscription_type", "flush"),
            ("push_policy", "all"),
            ("buffer.length", "8"),
            ("buffer.write.full_policy", "block"),
            ("buffer.write.timeout", "2.0"),
            ("buffer.read.empty_policy", "do_nothing"),
        ],
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    pair.reader.set_behavior(Box::new(Reader {
        inp: pair.inp.clone(),
        seen: seen.clone(),
    }));
    pair.reader.initialize().expect("init reader");

    let ec = PeriodicExecutionContext::with_rate(100.0).expect("ec");
    ec.add_component(&pair.reader).expect("add");
    ec.start().expect("start");
    ec.activate_component(&pair.reader).expect("activate");

    const SAMPLES: i32 = 200;
    let out = pair.out.clone();
    let writer = std::thread::spawn(move || {
        for n in 1..=SAMPLES {
            let status = out.write(&TimedLong::now(n));
            assert!(status.is_ok(), "write {} failed: {}", n, status);
            std::thread::sleep(Duration::from_millis(1));
        }
    });
    writer.join().expect("writer thread");

    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.lock().len() < SAMPLES as usize && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    ec.stop().expect("stop");
    assert_eq!(*seen.lock(), (1..=SAMPLES).collect::<Vec<_>>());
}

#[test]
fn test_periodic_new_forwards_latest_only() {
    let broker = ObjectBroker::new();
    let pair = pair(&broker);
    connect(
        &pair,
        &[
            ("dataflow_type", "push"),
            ("subscription_type", "periodic"),
            ("push_policy", "new"),
            ("push_rate", "10"),
            ("buffer.read.empty_policy", "do_nothing"),
        ],
    );
    let out: Arc<dyn PortService> = pair.out.clone();
    out.activate_interfaces();

    for n in 1..=50 {
        pair.out.write(&TimedLong::now(n));
    }
    std::thread::sleep(Duration::from_millis(350));
    let burst = drain(&pair.inp);
    assert!(!burst.is_empty() && burst.len() <= 2, "received {:?}", burst);
    assert_eq!(burst.last(), Some(&50));

    let start = Instant::now();
    let mut n = 100;
    while start.elapsed() < Duration::from_millis(500) {
        n += 1;
        pair.out.write(&TimedLong::now(n));
        std::thread::sleep(Duration::from_millis(1));
    }
    std::thread::sleep(Duration::from_millis(150));
    out.deactivate_interfaces();

    let received = drain(&pair.inp);
    assert!(
        (3..=8).contains(&received.len()),
        "expected about 5 samples at 10 Hz, got {}",
        received.len()
    );
    assert!(received.windows(2).all(|w| w[0] < w[1]));
    assert!(received.iter().all(|v| *v > 100 && *v <= n));
}

#[test]
fn test_pull_reads_from_writer_buffer() {
    let broker = ObjectBroker::new();
    let pair = pair(&broker);
    let id = connect(
        &pair,
        &[
            ("dataflow_type", "pull"),
            ("buffer.read.empty_policy", "do_nothing"),
        ],
    );
    assert_eq!(pair.inp.connector_ids(), vec![id.clone()]);
    assert_eq!(pair.out.connector_ids(), vec![id]);

    for n in [7, 8, 9] {
        assert!(pair.out.write(&TimedLong::now(n)).is_ok());
    }
    assert_eq!(drain(&pair.inp), vec![7, 8, 9]);
    assert!(pair.inp.read().is_err());
    assert_eq!(pair.inp.value().data, 9);
}

#[test]
fn test_write_without_connection_is_harmless() {
    let broker = ObjectBroker::new();
    let pair = pair(&broker);
    assert!(pair.out.write(&TimedLong::now(1)).is_ok());
    assert!(pair.inp.read().is_err());
    assert!(pair.inp.is_empty());
}
