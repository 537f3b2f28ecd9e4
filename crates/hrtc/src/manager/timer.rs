// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Coarse manager timer.
//!
//! One worker thread ticks every `timer.tick` seconds and fires each
//! registered callback once its interval has elapsed. Callbacks run outside
//! the registration lock.

use crate::error::{RtcError, RtcResult};
use crate::task::{PeriodicTask, TaskControl, TaskMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type TimerId = u64;

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    id: TimerId,
    interval: Duration,
    due: Instant,
    callback: Callback,
}

pub struct Timer {
    tick: Duration,
    entries: Arc<Mutex<Vec<Entry>>>,
    task: Mutex<Option<PeriodicTask>>,
    next_id: AtomicU64,
}

impl Timer {
    pub fn new(tick: Duration) -> RtcResult<Self> {
        if tick.is_zero() {
            return Err(RtcError::bad_param("timer tick must be positive"));
        }
        Ok(Self {
            tick,
            entries: Arc::new(Mutex::new(Vec::new())),
            task: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub fn start(&self) -> RtcResult<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(RtcError::precondition("timer already running"));
        }
        let entries = self.entries.clone();
        *task = Some(PeriodicTask::spawn(
            "rtc-timer",
            TaskMode::Periodic(self.tick),
            move || {
                fire_due(&entries, Instant::now());
                TaskControl::Continue
            },
        )?);
        log::debug!("[Timer::start] tick {:?}", self.tick);
        Ok(())
    }

    pub fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            task.stop();
            log::debug!("[Timer::stop]");
        }
    }

    /// Call `callback` every `interval` (rounded up to the tick).
    pub fn register<F>(&self, interval: Duration, callback: F) -> RtcResult<TimerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(RtcError::bad_param("timer interval must be positive"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push(Entry {
            id,
            interval,
            due: Instant::now() + interval,
            callback: Arc::new(callback),
        });
        Ok(id)
    }

    pub fn unregister(&self, id: TimerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fire_due(entries: &Mutex<Vec<Entry>>, now: Instant) {
    let due: Vec<Callback> = {
        let mut entries = entries.lock();
        entries
            .iter_mut()
            .filter(|e| e.due <= now)
            .map(|e| {
                e.due = now + e.interval;
                e.callback.clone()
            })
            .collect()
    };
    for cb in due {
        cb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_zero_tick_rejected() {
        assert!(Timer::new(Duration::ZERO).is_err());
    }

    #[test]
    fn test_fire_due_only_expired() {
        let entries = Mutex::new(Vec::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let now = Instant::now();
        entries.lock().push(Entry {
            id: 1,
            interval: Duration::from_secs(10),
            due: now,
            callback: Arc::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        });
        fire_due(&entries, now);
        fire_due(&entries, now + Duration::from_secs(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        fire_due(&entries, now + Duration::from_secs(11));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timer_fires_and_unregisters() {
        let timer = Timer::new(Duration::from_millis(5)).expect("timer");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = timer
            .register(Duration::from_millis(10), move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .expect("register");
        timer.start().expect("start");
        std::thread::sleep(Duration::from_millis(100));
        assert!(hits.load(Ordering::SeqCst) >= 2);

        assert!(timer.unregister(id));
        assert!(!timer.unregister(id));
        let seen = hits.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert!(hits.load(Ordering::SeqCst) <= seen + 1);
        timer.stop();
        assert!(!timer.is_running());
    }
}
