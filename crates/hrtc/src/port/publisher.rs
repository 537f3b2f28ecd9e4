// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publishers: policy-driven forwarding from an output buffer to a consumer.
//!
//! | `subscription_type` | Firing                                          |
//! |---------------------|-------------------------------------------------|
//! | `flush`             | inline in the writer's thread, no buffering      |
//! | `periodic`          | worker thread at `push_rate` Hz                  |
//! | `new`               | worker thread signalled by every write           |
//!
//! Periodic and new publishers apply `push_policy` on each firing:
//!
//! - `all`: send every buffered entry, stopping at the first failure.
//! - `fifo`: send the oldest entry.
//! - `skip`: send one entry, then discard `skip_count` entries; the pending
//!   discard count carries over to the next firing.
//! - `new`: discard everything but the newest entry and send it.
//!
//! A `CONNECTION_LOST` result is sticky: the publisher refuses further writes
//! until its connector is disconnected.

use super::consumer::InPortConsumer;
use super::dataflow;
use super::listener::{ConnectorDataListenerType as D, ConnectorListenerType as C};
use super::{ConnectorInfo, ConnectorListeners, DataPortStatus};
use crate::buffer::Buffer;
use crate::cdr::ByteData;
use crate::error::{RtcError, RtcResult};
use crate::task::{PeriodicTask, TaskControl, TaskMode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Default `push_rate` in Hz.
pub const DEFAULT_PUSH_RATE: f64 = 100.0;

/// `push_policy` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushPolicy {
    All,
    Fifo,
    Skip,
    #[default]
    New,
}

impl PushPolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "fifo" => Some(Self::Fifo),
            "skip" => Some(Self::Skip),
            "new" => Some(Self::New),
            _ => None,
        }
    }
}

/// `subscription_type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionType {
    #[default]
    Flush,
    New,
    Periodic,
}

impl SubscriptionType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flush" => Some(Self::Flush),
            "new" => Some(Self::New),
            "periodic" => Some(Self::Periodic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flush => "flush",
            Self::New => "new",
            Self::Periodic => "periodic",
        }
    }
}

/// Publisher settings read from the connector profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    pub subscription_type: SubscriptionType,
    pub push_policy: PushPolicy,
    pub push_rate: f64,
    pub skip_count: usize,
}

impl PublisherConfig {
    pub fn from_info(info: &ConnectorInfo) -> RtcResult<Self> {
        let prop = &info.properties;
        let sub = prop.get_property("subscription_type");
        let subscription_type = if sub.is_empty() {
            SubscriptionType::default()
        } else {
            SubscriptionType::parse(sub)
                .ok_or_else(|| RtcError::bad_param(format!("unknown subscription_type '{}'", sub)))?
        };
        let policy = prop.get_property("push_policy");
        let push_policy = if policy.is_empty() {
            PushPolicy::default()
        } else {
            PushPolicy::parse(policy)
                .ok_or_else(|| RtcError::bad_param(format!("unknown push_policy '{}'", policy)))?
        };
        let rate = prop.get_property("push_rate");
        let push_rate = if rate.is_empty() {
            DEFAULT_PUSH_RATE
        } else {
            rate.trim()
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r > 0.0)
                .ok_or_else(|| RtcError::bad_param(format!("invalid push_rate '{}'", rate)))?
        };
        let skip = prop.get_property("skip_count");
        let skip_count = if skip.is_empty() {
            0
        } else {
            skip.trim()
                .parse::<usize>()
                .map_err(|_| RtcError::bad_param(format!("invalid skip_count '{}'", skip)))?
        };
        Ok(Self {
            subscription_type,
            push_policy,
            push_rate,
            skip_count,
        })
    }
}

/// Forwarding half of an output push connector.
pub trait Publisher: Send + Sync {
    /// Hand one payload to the publisher.
    fn write(&self, data: &ByteData) -> DataPortStatus;

    /// Start the worker, if any.
    fn activate(&self) -> RtcResult<()>;

    /// Stop the worker, if any. In-flight sends complete first.
    fn deactivate(&self);

    fn is_active(&self) -> bool;

    /// Result of the most recent send.
    fn last_status(&self) -> DataPortStatus;
}

struct PushState {
    /// Entries still to discard under the skip policy.
    left_skip: usize,
}

struct PublisherCore {
    info: ConnectorInfo,
    consumer: Arc<dyn InPortConsumer>,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
    config: PublisherConfig,
    retcode: Mutex<DataPortStatus>,
    push: Mutex<PushState>,
}

impl PublisherCore {
    fn lost(&self) -> bool {
        *self.retcode.lock() == DataPortStatus::ConnectionLost
    }

    fn store(&self, data: &ByteData) -> DataPortStatus {
        if self.lost() {
            return DataPortStatus::ConnectionLost;
        }
        let status = dataflow::store(self.buffer.as_ref(), &self.listeners, &self.info, data);
        dataflow::write_status(status)
    }

    fn send(&self, data: &ByteData) -> DataPortStatus {
        self.listeners.notify_data(D::OnSend, &self.info, data);
        let ret = self.consumer.put(data);
        if ret.is_ok() {
            self.listeners.notify_data(D::OnReceived, &self.info, data);
        } else {
            self.invoke_listener(ret, data);
        }
        *self.retcode.lock() = ret;
        ret
    }

    fn invoke_listener(&self, ret: DataPortStatus, data: &ByteData) {
        match ret {
            DataPortStatus::SendFull => {
                self.listeners.notify_data(D::OnReceiverFull, &self.info, data)
            }
            DataPortStatus::SendTimeout => {
                self.listeners.notify_data(D::OnReceiverTimeout, &self.info, data)
            }
            DataPortStatus::ConnectionLost => {
                log::warn!("[Publisher] connection lost on {}", self.info.id);
                self.listeners.notify_data(D::OnReceiverError, &self.info, data);
            }
            _ => self.listeners.notify_data(D::OnReceiverError, &self.info, data),
        }
    }

    fn buffer_is_empty(&self) -> bool {
        if self.buffer.empty() {
            self.listeners.notify(C::OnBufferEmpty, &self.info);
            self.listeners.notify(C::OnSenderEmpty, &self.info);
            true
        } else {
            false
        }
    }

    /// Send the entry at the read pointer; advance past it on success.
    fn send_head(&self) -> Option<DataPortStatus> {
        let data = self.buffer.get()?;
        self.listeners.notify_data(D::OnBufferRead, &self.info, &data);
        let ret = self.send(&data);
        if ret.is_ok() {
            self.buffer.advance_read_ptr(1);
        }
        Some(ret)
    }

    /// One firing under the configured push policy.
    fn push(&self) -> DataPortStatus {
        let mut state = self.push.lock();
        if self.lost() {
            return DataPortStatus::ConnectionLost;
        }
        if self.buffer_is_empty() {
            return DataPortStatus::BufferEmpty;
        }
        match self.config.push_policy {
            PushPolicy::All => {
                while self.buffer.readable() > 0 {
                    match self.send_head() {
                        Some(ret) if ret.is_ok() => {}
                        Some(ret) => return ret,
                        None => break,
                    }
                }
                DataPortStatus::PortOk
            }
            PushPolicy::Fifo => self.send_head().unwrap_or(DataPortStatus::BufferEmpty),
            PushPolicy::Skip if self.config.skip_count == 0 => {
                self.send_head().unwrap_or(DataPortStatus::BufferEmpty)
            }
            PushPolicy::Skip => {
                let mut ret = DataPortStatus::PortOk;
                while self.buffer.readable() > 0 {
                    if state.left_skip > 0 {
                        let n = state.left_skip.min(self.buffer.readable());
                        self.buffer.advance_read_ptr(n as isize);
                        state.left_skip -= n;
                        continue;
                    }
                    match self.send_head() {
                        Some(r) if r.is_ok() => state.left_skip = self.config.skip_count,
                        Some(r) => {
                            ret = r;
                            break;
                        }
                        None => break,
                    }
                }
                ret
            }
            PushPolicy::New => {
                let readable = self.buffer.readable();
                if readable > 1 {
                    self.buffer.advance_read_ptr(readable as isize - 1);
                }
                self.send_head().unwrap_or(DataPortStatus::BufferEmpty)
            }
        }
    }
}

/// Synchronous publisher: each write is sent before `write` returns.
pub struct PublisherFlush {
    core: Arc<PublisherCore>,
    active: Mutex<bool>,
}

impl Publisher for PublisherFlush {
    fn write(&self, data: &ByteData) -> DataPortStatus {
        if self.core.lost() {
            return DataPortStatus::ConnectionLost;
        }
        let _serialize = self.core.push.lock();
        self.core.send(data)
    }

    fn activate(&self) -> RtcResult<()> {
        *self.active.lock() = true;
        Ok(())
    }

    fn deactivate(&self) {
        *self.active.lock() = false;
    }

    fn is_active(&self) -> bool {
        *self.active.lock()
    }

    fn last_status(&self) -> DataPortStatus {
        *self.core.retcode.lock()
    }
}

/// Buffered publisher driven by a worker thread (periodic or signalled).
pub struct PublisherTask {
    core: Arc<PublisherCore>,
    mode: TaskMode,
    task: Mutex<Option<PeriodicTask>>,
}

impl PublisherTask {
    fn task_name(&self) -> String {
        let short: String = self.core.info.id.chars().take(8).collect();
        format!("pub-{}", short)
    }
}

impl Publisher for PublisherTask {
    fn write(&self, data: &ByteData) -> DataPortStatus {
        let ret = self.core.store(data);
        if self.mode == TaskMode::Signalled {
            if let Some(task) = self.task.lock().as_ref() {
                task.signal();
            }
        }
        ret
    }

    fn activate(&self) -> RtcResult<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }
        let core = self.core.clone();
        *task = Some(PeriodicTask::spawn(&self.task_name(), self.mode, move || {
            core.push();
            TaskControl::Continue
        })?);
        log::debug!(
            "[PublisherTask::activate] {} {:?} policy {:?}",
            self.core.info.id,
            self.mode,
            self.core.config.push_policy
        );
        Ok(())
    }

    fn deactivate(&self) {
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            task.stop();
        }
    }

    fn is_active(&self) -> bool {
        self.task.lock().is_some()
    }

    fn last_status(&self) -> DataPortStatus {
        *self.core.retcode.lock()
    }
}

impl Drop for PublisherTask {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Build the publisher selected by `config.subscription_type`.
pub fn create_publisher(
    config: PublisherConfig,
    info: ConnectorInfo,
    consumer: Arc<dyn InPortConsumer>,
    buffer: Arc<dyn Buffer>,
    listeners: Arc<ConnectorListeners>,
) -> Box<dyn Publisher> {
    let subscription = config.subscription_type;
    let period = Duration::from_secs_f64(1.0 / config.push_rate);
    let core = Arc::new(PublisherCore {
        info,
        consumer,
        buffer,
        listeners,
        config,
        retcode: Mutex::new(DataPortStatus::PortOk),
        push: Mutex::new(PushState { left_skip: 0 }),
    });
    match subscription {
        SubscriptionType::Flush => Box::new(PublisherFlush {
            core,
            active: Mutex::new(false),
        }),
        SubscriptionType::Periodic => Box::new(PublisherTask {
            core,
            mode: TaskMode::Periodic(period),
            task: Mutex::new(None),
        }),
        SubscriptionType::New => Box::new(PublisherTask {
            core,
            mode: TaskMode::Signalled,
            task: Mutex::new(None),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferConfig, RingBuffer};
    use crate::cdr::Endian;
    use crate::properties::Properties;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records delivered bytes; fails once `fail_after` deliveries happened.
    struct Sink {
        got: Mutex<Vec<u8>>,
        fail_after: usize,
        failure: DataPortStatus,
        calls: AtomicUsize,
    }

    impl Sink {
        fn new(fail_after: usize, failure: DataPortStatus) -> Arc<Self> {
            Arc::new(Self {
                got: Mutex::new(Vec::new()),
                fail_after,
                failure,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl InPortConsumer for Sink {
        fn put(&self, data: &ByteData) -> DataPortStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut got = self.got.lock();
            if got.len() >= self.fail_after {
                return self.failure;
            }
            got.push(data.as_bytes()[0]);
            DataPortStatus::PortOk
        }
    }

    fn core(policy: PushPolicy, skip: usize, sink: Arc<Sink>, length: usize) -> PublisherCore {
        PublisherCore {
            info: ConnectorInfo::default(),
            consumer: sink,
            buffer: Arc::new(RingBuffer::new(BufferConfig {
                length,
                ..BufferConfig::default()
            })),
            listeners: Arc::new(ConnectorListeners::new()),
            config: PublisherConfig {
                subscription_type: SubscriptionType::Periodic,
                push_policy: policy,
                push_rate: 100.0,
                skip_count: skip,
            },
            retcode: Mutex::new(DataPortStatus::PortOk),
            push: Mutex::new(PushState { left_skip: 0 }),
        }
    }

    fn fill(core: &PublisherCore, values: std::ops::Range<u8>) {
        for v in values {
            assert_eq!(core.store(&ByteData::new(vec![v], Endian::Little)), DataPortStatus::PortOk);
        }
    }

    #[test]
    fn test_all_drains_buffer() {
        let sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let core = core(PushPolicy::All, 0, sink.clone(), 8);
        fill(&core, 0..5);
        assert_eq!(core.push(), DataPortStatus::PortOk);
        assert_eq!(*sink.got.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(core.push(), DataPortStatus::BufferEmpty);
    }

    #[test]
    fn test_all_stops_on_first_failure() {
        let sink = Sink::new(2, DataPortStatus::SendFull);
        let core = core(PushPolicy::All, 0, sink.clone(), 8);
        fill(&core, 0..5);
        assert_eq!(core.push(), DataPortStatus::SendFull);
        assert_eq!(*sink.got.lock(), vec![0, 1]);
        assert_eq!(core.buffer.readable(), 3);
    }

    #[test]
    fn test_fifo_sends_one_per_firing() {
        let sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let core = core(PushPolicy::Fifo, 0, sink.clone(), 8);
        fill(&core, 0..3);
        core.push();
        core.push();
        assert_eq!(*sink.got.lock(), vec![0, 1]);
        assert_eq!(core.buffer.readable(), 1);
    }

    #[test]
    fn test_skip_carries_leftover_between_firings() {
        let sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let core = core(PushPolicy::Skip, 2, sink.clone(), 16);
        fill(&core, 0..4);
        core.push();
        // 0 sent, 1..=2 skipped, 3 sent, two more pending skips.
        assert_eq!(*sink.got.lock(), vec![0, 3]);
        fill(&core, 4..8);
        core.push();
        assert_eq!(*sink.got.lock(), vec![0, 3, 6]);
    }

    #[test]
    fn test_skip_zero_delivers_like_fifo() {
        let skip_sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let skip = core(PushPolicy::Skip, 0, skip_sink.clone(), 8);
        let fifo_sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let fifo = core(PushPolicy::Fifo, 0, fifo_sink.clone(), 8);
        fill(&skip, 0..6);
        fill(&fifo, 0..6);
        for tick in 1..=6 {
            skip.push();
            fifo.push();
            assert_eq!(skip_sink.got.lock().len(), tick);
            assert_eq!(*skip_sink.got.lock(), *fifo_sink.got.lock());
            assert_eq!(skip.buffer.readable(), fifo.buffer.readable());
        }
    }

    #[test]
    fn test_new_sends_latest_only() {
        let sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let core = core(PushPolicy::New, 0, sink.clone(), 8);
        fill(&core, 0..6);
        core.push();
        assert_eq!(*sink.got.lock(), vec![5]);
        assert!(core.buffer.empty());
    }

    #[test]
    fn test_connection_lost_is_sticky() {
        let sink = Sink::new(0, DataPortStatus::ConnectionLost);
        let core = core(PushPolicy::Fifo, 0, sink.clone(), 8);
        fill(&core, 0..2);
        assert_eq!(core.push(), DataPortStatus::ConnectionLost);
        let calls = sink.calls.load(Ordering::SeqCst);
        assert_eq!(core.store(&ByteData::default()), DataPortStatus::ConnectionLost);
        assert_eq!(core.push(), DataPortStatus::ConnectionLost);
        assert_eq!(sink.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_config_parsing() {
        let mut info = ConnectorInfo::default();
        let cfg = PublisherConfig::from_info(&info).expect("defaults");
        assert_eq!(cfg.subscription_type, SubscriptionType::Flush);
        assert_eq!(cfg.push_policy, PushPolicy::New);

        info.properties = Properties::from_pairs(&[
            ("subscription_type", "periodic"),
            ("push_policy", "skip"),
            ("push_rate", "20.0"),
            ("skip_count", "3"),
        ]);
        let cfg = PublisherConfig::from_info(&info).expect("parse");
        assert_eq!(cfg.push_policy, PushPolicy::Skip);
        assert_eq!(cfg.skip_count, 3);
        assert_eq!(cfg.push_rate, 20.0);

        info.properties.set_property("push_rate", "0");
        assert!(PublisherConfig::from_info(&info).is_err());
    }

    #[test]
    fn test_periodic_publisher_delivers_and_stops() {
        let sink = Sink::new(usize::MAX, DataPortStatus::PortError);
        let info = ConnectorInfo {
            properties: Properties::from_pairs(&[
                ("subscription_type", "periodic"),
                ("push_policy", "all"),
                ("push_rate", "200"),
            ]),
            ..ConnectorInfo::default()
        };
        let config = PublisherConfig::from_info(&info).expect("config");
        let publisher = create_publisher(
            config,
            info,
            sink.clone(),
            Arc::new(RingBuffer::new(BufferConfig::default())),
            Arc::new(ConnectorListeners::new()),
        );
        publisher.activate().expect("activate");
        for v in 0..4u8 {
            publisher.write(&ByteData::new(vec![v], Endian::Little));
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while sink.got.lock().len() < 4 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        publisher.deactivate();
        assert!(!publisher.is_active());
        assert_eq!(*sink.got.lock(), vec![0, 1, 2, 3]);
    }
}
