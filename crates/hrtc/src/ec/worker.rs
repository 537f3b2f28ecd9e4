// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant list of an execution context.

use crate::rtc::{ComponentStateMachine, RtObject};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// State machines of the participating components.
///
/// Readers take a lock-free snapshot, so a tick never blocks
/// `add_component`/`remove_component`.
#[derive(Default)]
pub struct ExecutionContextWorker {
    comps: ArcSwap<Vec<Arc<ComponentStateMachine>>>,
}

impl ExecutionContextWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sm: Arc<ComponentStateMachine>) {
        self.comps.rcu(|cur| {
            let mut next = Vec::clone(cur);
            next.push(sm.clone());
            next
        });
    }

    pub fn remove(&self, comp: &RtObject) -> Option<Arc<ComponentStateMachine>> {
        let found = self.find(comp)?;
        self.comps.rcu(|cur| {
            cur.iter()
                .filter(|sm| !sm.is(comp))
                .cloned()
                .collect::<Vec<_>>()
        });
        Some(found)
    }

    pub fn find(&self, comp: &RtObject) -> Option<Arc<ComponentStateMachine>> {
        self.comps.load().iter().find(|sm| sm.is(comp)).cloned()
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<ComponentStateMachine>>> {
        self.comps.load_full()
    }

    pub fn len(&self) -> usize {
        self.comps.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.load().is_empty()
    }

    /// One tick: step every participant in registration order.
    pub fn invoke(&self) {
        let comps = self.comps.load_full();
        for sm in comps.iter() {
            sm.work();
        }
    }
}
