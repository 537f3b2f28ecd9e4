// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context stepped explicitly by the caller.

use super::{ExecutionContext, ExecutionContextBase, ExecutionKind};
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Every state-machine step happens inside [`tick`](ExecutionContext::tick).
///
/// Transitions are never awaited: they complete on the next tick.
pub struct ExtTrigExecutionContext {
    base: ExecutionContextBase,
    tick_lock: Mutex<()>,
}

impl ExtTrigExecutionContext {
    pub fn new(props: &Properties) -> RtcResult<Arc<Self>> {
        let rate = ExecutionContextBase::configured_rate(props)?;
        let mut props = props.clone();
        props.set_property("sync_transition", "NO");
        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn ExecutionContext> = weak.clone();
            Self {
                base: ExecutionContextBase::new(ExecutionKind::Other, rate, &props, this),
                tick_lock: Mutex::new(()),
            }
        }))
    }
}

impl ExecutionContext for ExtTrigExecutionContext {
    fn base(&self) -> &ExecutionContextBase {
        &self.base
    }

    fn start(&self) -> RtcResult<()> {
        self.base.begin_start()
    }

    fn stop(&self) -> RtcResult<()> {
        self.base.begin_stop()?;
        // Let a tick in progress on another thread finish first.
        drop(self.tick_lock.lock());
        self.base.notify_shutdown();
        Ok(())
    }

    /// Run one step of every participant. Requires the context to be running.
    fn tick(&self) -> RtcResult<()> {
        let _guard = self.tick_lock.lock();
        if !self.base.is_running() {
            return Err(RtcError::precondition("execution context not running"));
        }
        self.base.worker().invoke();
        Ok(())
    }
}
