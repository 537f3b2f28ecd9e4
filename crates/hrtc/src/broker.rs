// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process object broker.
//!
//! Ports exchange endpoint references through connector-profile properties,
//! which are plain strings. The broker turns a servant (a provider, a service
//! implementation) into a string object key and resolves keys back to the
//! servant. It also owns the manager's event loop: [`ObjectBroker::run`]
//! blocks until [`ObjectBroker::shutdown`].
//!
//! The broker keeps the only long-lived strong reference to a servant.
//! Consumers keep weak references, so deactivating a servant is enough for
//! its peers to observe a lost connection.

use crate::error::{RtcError, RtcResult};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

const KEY_PREFIX: &str = "hrtc-obj:";

/// Process-unique object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", KEY_PREFIX, self.0)
    }
}

impl FromStr for ObjectId {
    type Err = RtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix(KEY_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(ObjectId)
            .ok_or_else(|| RtcError::bad_param(format!("malformed object key '{}'", s)))
    }
}

/// Type-erased servant handle.
pub type Servant = Arc<dyn Any + Send + Sync>;

/// Broker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Created,
    Active,
    Running,
    Shutdown,
}

/// Servant table and event loop.
pub struct ObjectBroker {
    servants: DashMap<ObjectId, Servant>,
    state: Mutex<BrokerState>,
    state_cv: Condvar,
}

impl ObjectBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            servants: DashMap::new(),
            state: Mutex::new(BrokerState::Created),
            state_cv: Condvar::new(),
        })
    }

    /// Register a servant and return its key.
    pub fn activate_object<T: Any + Send + Sync>(&self, servant: Arc<T>) -> ObjectId {
        self.activate_servant(servant)
    }

    /// Register an already type-erased servant.
    pub fn activate_servant(&self, servant: Servant) -> ObjectId {
        let id = ObjectId::next();
        self.servants.insert(id, servant);
        log::trace!("[ObjectBroker::activate_servant] {}", id);
        id
    }

    /// Drop the broker's reference to a servant.
    pub fn deactivate_object(&self, id: ObjectId) -> bool {
        let removed = self.servants.remove(&id).is_some();
        if removed {
            log::trace!("[ObjectBroker::deactivate_object] {}", id);
        }
        removed
    }

    /// Resolve a key to the servant it names.
    pub fn resolve(&self, id: ObjectId) -> Option<Servant> {
        self.servants.get(&id).map(|s| s.value().clone())
    }

    /// Resolve a key and downcast it to the concrete servant type.
    pub fn resolve_as<T: Any + Send + Sync>(&self, id: ObjectId) -> Option<Arc<T>> {
        self.resolve(id)?.downcast::<T>().ok()
    }

    /// Parse and resolve a string key.
    pub fn string_to_object<T: Any + Send + Sync>(&self, key: &str) -> RtcResult<Arc<T>> {
        let id: ObjectId = key.parse()?;
        self.resolve_as::<T>(id)
            .ok_or_else(|| RtcError::NotFound(format!("object {}", key)))
    }

    /// Number of active servants.
    pub fn servant_count(&self) -> usize {
        self.servants.len()
    }

    pub fn state(&self) -> BrokerState {
        *self.state.lock()
    }

    /// Accept requests. Required before [`run`](Self::run).
    pub fn activate(&self) -> RtcResult<()> {
        let mut state = self.state.lock();
        match *state {
            BrokerState::Created | BrokerState::Active => {
                *state = BrokerState::Active;
                Ok(())
            }
            BrokerState::Running => Ok(()),
            BrokerState::Shutdown => Err(RtcError::precondition("broker already shut down")),
        }
    }

    /// Block the calling thread until [`shutdown`](Self::shutdown).
    pub fn run(&self) -> RtcResult<()> {
        let mut state = self.state.lock();
        match *state {
            BrokerState::Created => return Err(RtcError::precondition("broker not activated")),
            BrokerState::Shutdown => return Ok(()),
            BrokerState::Running => {
                return Err(RtcError::precondition("broker loop already running"))
            }
            BrokerState::Active => *state = BrokerState::Running,
        }
        log::debug!("[ObjectBroker::run] event loop entered");
        while *state != BrokerState::Shutdown {
            self.state_cv.wait(&mut state);
        }
        log::debug!("[ObjectBroker::run] event loop left");
        Ok(())
    }

    /// Wait up to `timeout` for the broker to reach the shutdown state.
    pub fn wait_shutdown(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if *state == BrokerState::Shutdown {
            return true;
        }
        self.state_cv.wait_for(&mut state, timeout);
        *state == BrokerState::Shutdown
    }

    /// Release every servant and wake [`run`](Self::run).
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if *state == BrokerState::Shutdown {
                return;
            }
            *state = BrokerState::Shutdown;
        }
        self.servants.clear();
        self.state_cv.notify_all();
        log::debug!("[ObjectBroker::shutdown] broker shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(u32);

    #[test]
    fn test_object_key_roundtrip() {
        let id = ObjectId::next();
        let parsed: ObjectId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
        assert!("IOR:0000".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_activate_resolve_deactivate() {
        let broker = ObjectBroker::new();
        let servant = Arc::new(Echo(7));
        let id = broker.activate_object(servant.clone());
        let back: Arc<Echo> = broker.string_to_object(&id.to_string()).expect("resolve");
        assert_eq!(back.0, 7);
        assert!(broker.resolve_as::<String>(id).is_none());

        let weak = Arc::downgrade(&back);
        drop(back);
        drop(servant);
        assert!(weak.upgrade().is_some());
        assert!(broker.deactivate_object(id));
        assert!(weak.upgrade().is_none());
        assert!(matches!(
            broker.string_to_object::<Echo>(&id.to_string()),
            Err(RtcError::NotFound(_))
        ));
    }

    #[test]
    fn test_erased_servant_keeps_concrete_type() {
        let broker = ObjectBroker::new();
        let servant: Servant = Arc::new(Echo(3));
        let id = broker.activate_servant(servant);
        assert_eq!(broker.resolve_as::<Echo>(id).expect("resolve").0, 3);
        assert_eq!(broker.servant_count(), 1);
    }

    #[test]
    fn test_run_returns_after_shutdown() {
        let broker = ObjectBroker::new();
        assert!(broker.run().is_err());
        broker.activate().expect("activate");
        let runner = broker.clone();
        let handle = std::thread::spawn(move || runner.run());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(broker.state(), BrokerState::Running);
        broker.shutdown();
        assert!(handle.join().expect("join").is_ok());
        assert!(broker.wait_shutdown(Duration::from_millis(1)));
        assert!(broker.activate().is_err());
    }
}
