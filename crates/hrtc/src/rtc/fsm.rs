// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic entry/do/exit state machine.
//!
//! Transitions are only requested with [`StateMachine::go_to`]; they take
//! effect when the owner calls [`StateMachine::worker`]. Actions run without
//! the state lock held, so an action may request a further transition.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Previous, current and requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHolder<S> {
    pub prev: S,
    pub curr: S,
    pub next: S,
}

/// Actions run by [`StateMachine::worker`]. All default to no-ops.
#[allow(unused_variables)]
pub trait StateActions<S> {
    fn entry(&self, st: &StateHolder<S>) {}
    fn pre_do(&self, st: &StateHolder<S>) {}
    fn do_action(&self, st: &StateHolder<S>) {}
    fn post_do(&self, st: &StateHolder<S>) {}
    fn exit(&self, st: &StateHolder<S>) {}
}

struct Inner<S> {
    holder: StateHolder<S>,
    self_trans: bool,
}

pub struct StateMachine<S> {
    inner: Mutex<Inner<S>>,
    changed: Condvar,
}

impl<S: Copy + Eq> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                holder: StateHolder {
                    prev: initial,
                    curr: initial,
                    next: initial,
                },
                self_trans: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn states(&self) -> StateHolder<S> {
        self.inner.lock().holder
    }

    pub fn current(&self) -> S {
        self.inner.lock().holder.curr
    }

    pub fn is_in(&self, state: S) -> bool {
        self.current() == state
    }

    /// Request a transition. Requesting the current state forces exit and
    /// entry on the next worker run.
    pub fn go_to(&self, state: S) {
        let mut inner = self.inner.lock();
        inner.holder.next = state;
        if inner.holder.curr == state {
            inner.self_trans = true;
        }
    }

    /// Request `to` only while settled in `from`, or already heading to
    /// `to`. The check and the request happen under one lock. On refusal
    /// the states seen are returned.
    pub fn go_to_from(&self, from: S, to: S) -> Result<(), StateHolder<S>> {
        let mut inner = self.inner.lock();
        let st = inner.holder;
        if st.curr != from || (st.next != st.curr && st.next != to) {
            return Err(st);
        }
        inner.holder.next = to;
        if st.curr == to {
            inner.self_trans = true;
        }
        Ok(())
    }

    pub fn need_trans(&self) -> bool {
        let inner = self.inner.lock();
        inner.holder.curr != inner.holder.next || inner.self_trans
    }

    /// Run one step: either the do-actions of the current state, or one
    /// pending transition.
    pub fn worker<A: StateActions<S>>(&self, actions: &A) {
        let (st, forced) = {
            let inner = self.inner.lock();
            (inner.holder, inner.self_trans)
        };
        if st.curr == st.next && !forced {
            actions.pre_do(&st);
            if self.need_trans() {
                return;
            }
            actions.do_action(&st);
            if self.need_trans() {
                return;
            }
            actions.post_do(&st);
            return;
        }

        actions.exit(&st);
        let target = {
            let mut inner = self.inner.lock();
            // An exit action that re-requests the current state cancels.
            inner.self_trans = false;
            if inner.holder.curr == inner.holder.next && !forced {
                None
            } else {
                Some(inner.holder)
            }
        };
        let Some(mut st) = target else {
            self.changed.notify_all();
            return;
        };
        st.prev = st.curr;
        st.curr = st.next;
        actions.entry(&st);
        {
            let mut inner = self.inner.lock();
            inner.holder.prev = st.prev;
            inner.holder.curr = st.curr;
        }
        self.changed.notify_all();
    }

    /// Wait until `pred` holds for the current states or `timeout` elapses.
    pub fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&StateHolder<S>) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while !pred(&inner.holder) {
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                return pred(&inner.holder);
            }
        }
        true
    }
}
