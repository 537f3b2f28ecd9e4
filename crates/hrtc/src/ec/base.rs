// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State shared by every execution context.
//!
//! Recognized properties:
//!
//! ```text
//! rate                 Hz, > 0                  (default 1000)
//! sync_transition      YES/NO                   (default YES)
//! transition_timeout   seconds                  (default 0.5)
//! ```

use super::{
    ExecutionContext, ExecutionContextProfile, ExecutionContextWorker, ExecutionKind,
    DEFAULT_EC_RATE,
};
use crate::broker::ObjectId;
use crate::error::{RtcError, RtcResult};
use crate::properties::{to_bool, Properties};
use crate::rtc::{ComponentStateMachine, RtObject, ECOTHER_OFFSET};
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

const DEFAULT_TRANSITION_TIMEOUT: f64 = 0.5;

pub struct ExecutionContextBase {
    id: ObjectId,
    this: Weak<dyn ExecutionContext>,
    kind: ExecutionKind,
    rate: ArcSwap<f64>,
    owner: RwLock<Option<Weak<RtObject>>>,
    properties: RwLock<Properties>,
    worker: Arc<ExecutionContextWorker>,
    running: AtomicBool,
    sync_transition: bool,
    transition_timeout: Duration,
}

fn check_rate(rate: f64) -> RtcResult<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(RtcError::bad_param(format!("invalid rate {}", rate)))
    }
}

impl ExecutionContextBase {
    /// Rate configured in `props`, validated.
    pub fn configured_rate(props: &Properties) -> RtcResult<f64> {
        let rate_str = props.get_property("rate");
        let rate = if rate_str.is_empty() {
            DEFAULT_EC_RATE
        } else {
            rate_str
                .trim()
                .parse::<f64>()
                .map_err(|_| RtcError::bad_param(format!("invalid rate '{}'", rate_str)))?
        };
        check_rate(rate)?;
        Ok(rate)
    }

    /// `rate` comes from [`configured_rate`](Self::configured_rate); `this`
    /// is the weak self-reference obtained from `Arc::new_cyclic`.
    pub fn new(
        kind: ExecutionKind,
        rate: f64,
        props: &Properties,
        this: Weak<dyn ExecutionContext>,
    ) -> Self {
        let timeout = props
            .get_property("transition_timeout")
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .unwrap_or(DEFAULT_TRANSITION_TIMEOUT);
        Self {
            id: ObjectId::next(),
            this,
            kind,
            rate: ArcSwap::from_pointee(rate),
            owner: RwLock::new(None),
            properties: RwLock::new(props.clone()),
            worker: Arc::new(ExecutionContextWorker::new()),
            running: AtomicBool::new(false),
            sync_transition: to_bool(props.get_property("sync_transition"), true),
            transition_timeout: Duration::from_secs_f64(timeout),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ExecutionKind {
        self.kind
    }

    pub fn rate(&self) -> f64 {
        **self.rate.load()
    }

    /// Tick period derived from the rate.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate())
    }

    /// Validate and record a new rate.
    pub fn store_rate(&self, rate: f64) -> RtcResult<()> {
        check_rate(rate)?;
        self.rate.store(Arc::new(rate));
        self.properties
            .write()
            .set_property("rate", &rate.to_string());
        Ok(())
    }

    pub fn worker(&self) -> &Arc<ExecutionContextWorker> {
        &self.worker
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn sync_transition(&self) -> bool {
        self.sync_transition
    }

    pub fn transition_timeout(&self) -> Duration {
        self.transition_timeout
    }

    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }

    pub fn owner(&self) -> Option<Arc<RtObject>> {
        self.owner.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn profile(&self) -> ExecutionContextProfile {
        ExecutionContextProfile {
            kind: self.kind,
            rate: self.rate(),
            owner: self.owner().map(|o| o.instance_name()),
            participants: self
                .worker
                .snapshot()
                .iter()
                .map(|sm| sm.component().instance_name())
                .collect(),
            properties: self.properties(),
        }
    }

    /// Mark running and fire `on_startup`.
    pub fn begin_start(&self) -> RtcResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RtcError::precondition("execution context already running"));
        }
        log::debug!("[ExecutionContext::start] {} ({})", self.id, self.kind);
        for sm in self.worker.snapshot().iter() {
            sm.on_startup();
        }
        Ok(())
    }

    /// Undo [`begin_start`](Self::begin_start) after a failed start.
    pub fn abort_start(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Mark stopped. The caller stops ticking, then calls
    /// [`notify_shutdown`](Self::notify_shutdown).
    pub fn begin_stop(&self) -> RtcResult<()> {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RtcError::precondition("execution context not running"));
        }
        log::debug!("[ExecutionContext::stop] {}", self.id);
        Ok(())
    }

    pub fn notify_shutdown(&self) {
        for sm in self.worker.snapshot().iter() {
            sm.on_shutdown();
        }
    }

    pub fn notify_rate_changed(&self) {
        log::debug!("[ExecutionContext::set_rate] {} -> {} Hz", self.id, self.rate());
        for sm in self.worker.snapshot().iter() {
            sm.on_rate_changed();
        }
    }

    fn this(&self) -> RtcResult<Arc<dyn ExecutionContext>> {
        self.this
            .upgrade()
            .ok_or_else(|| RtcError::Internal("execution context dropped".into()))
    }

    pub fn state_machine(&self, comp: &RtObject) -> RtcResult<Arc<ComponentStateMachine>> {
        self.worker.find(comp).ok_or_else(|| {
            RtcError::bad_param(format!(
                "{} does not participate in context {}",
                comp.instance_name(),
                self.id
            ))
        })
    }

    pub fn bind_component(&self, comp: &Arc<RtObject>) -> RtcResult<()> {
        if self.worker.find(comp).is_some() {
            return Err(RtcError::bad_param(format!(
                "{} already participates",
                comp.instance_name()
            )));
        }
        let ec_id = comp.bind_context(self.this()?)?;
        *self.owner.write() = Some(Arc::downgrade(comp));
        self.worker
            .add(Arc::new(ComponentStateMachine::new(ec_id, comp.clone())));
        log::debug!(
            "[ExecutionContext::bind_component] {} owns {} (id {})",
            comp.instance_name(),
            self.id,
            ec_id
        );
        Ok(())
    }

    pub fn add_component(&self, comp: &Arc<RtObject>) -> RtcResult<()> {
        if comp.is_finalized() {
            return Err(RtcError::bad_param("component finalized"));
        }
        if self.worker.find(comp).is_some() {
            return Err(RtcError::bad_param(format!(
                "{} already participates",
                comp.instance_name()
            )));
        }
        let ec_id = comp.attach_context(self.this()?)?;
        self.worker
            .add(Arc::new(ComponentStateMachine::new(ec_id, comp.clone())));
        log::debug!(
            "[ExecutionContext::add_component] {} -> {} (id {})",
            comp.instance_name(),
            self.id,
            ec_id
        );
        Ok(())
    }

    pub fn remove_component(&self, comp: &RtObject) -> RtcResult<()> {
        let sm = self.worker.remove(comp).ok_or_else(|| {
            RtcError::bad_param(format!(
                "{} does not participate in context {}",
                comp.instance_name(),
                self.id
            ))
        })?;
        if sm.ec_id() >= ECOTHER_OFFSET {
            if let Err(e) = comp.detach_context(sm.ec_id()) {
                log::debug!("[ExecutionContext::remove_component] {}", e);
            }
        }
        log::debug!(
            "[ExecutionContext::remove_component] {} <- {}",
            comp.instance_name(),
            self.id
        );
        Ok(())
    }
}
