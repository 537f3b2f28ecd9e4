// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Worker-thread scheduler shared by execution contexts, publishers and timers.
//!
//! A [`PeriodicTask`] owns one thread that runs a body either at a fixed period
//! or once per signal. All control (signal, rate change, suspend, stop) goes
//! through a channel, so the worker never sleeps blindly: `stop()` wakes it
//! immediately and returns once the in-flight body invocation has completed.

use crate::error::{RtcError, RtcResult};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// How the task decides when to run its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Run every `period`.
    Periodic(Duration),
    /// Run once per [`PeriodicTask::signal`] (pending signals coalesce).
    Signalled,
}

/// Returned by the task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    /// Keep scheduling.
    Continue,
    /// Exit the worker thread.
    Stop,
}

#[derive(Debug)]
enum Command {
    Signal,
    SetPeriod(Duration),
    Suspend,
    Resume,
    Stop,
}

/// Handle to a running worker thread.
///
/// Dropping the handle stops the worker.
pub struct PeriodicTask {
    name: String,
    tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
    runs: Arc<AtomicU64>,
}

impl PeriodicTask {
    /// Spawn a worker thread running `body` according to `mode`.
    pub fn spawn<F>(name: &str, mode: TaskMode, body: F) -> RtcResult<Self>
    where
        F: FnMut() -> TaskControl + Send + 'static,
    {
        if let TaskMode::Periodic(period) = mode {
            if period.is_zero() {
                return Err(RtcError::bad_param("task period must be positive"));
            }
        }
        let (tx, rx) = unbounded();
        let runs = Arc::new(AtomicU64::new(0));
        let runs_worker = runs.clone();
        let thread_name = name.to_string();
        let thread = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::debug!("[PeriodicTask] {} started ({:?})", thread_name, mode);
                match mode {
                    TaskMode::Periodic(period) => periodic_loop(&rx, period, body, &runs_worker),
                    TaskMode::Signalled => signalled_loop(&rx, body, &runs_worker),
                }
                log::debug!("[PeriodicTask] {} stopped", thread_name);
            })
            .map_err(|e| RtcError::OutOfResources(format!("cannot spawn {}: {}", name, e)))?;
        let thread_id = Some(thread.thread().id());
        Ok(Self {
            name: name.to_string(),
            tx,
            thread: Some(thread),
            thread_id,
            runs,
        })
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wake a [`TaskMode::Signalled`] task.
    pub fn signal(&self) {
        let _ = self.tx.send(Command::Signal);
    }

    /// Change the period of a [`TaskMode::Periodic`] task.
    pub fn set_period(&self, period: Duration) -> RtcResult<()> {
        if period.is_zero() {
            return Err(RtcError::bad_param("task period must be positive"));
        }
        let _ = self.tx.send(Command::SetPeriod(period));
        Ok(())
    }

    /// Pause scheduling without ending the thread.
    pub fn suspend(&self) {
        let _ = self.tx.send(Command::Suspend);
    }

    /// Resume after [`suspend`](Self::suspend).
    pub fn resume(&self) {
        let _ = self.tx.send(Command::Resume);
    }

    /// Number of completed body invocations.
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    /// True when called from this task's own worker thread.
    pub fn is_worker_thread(&self) -> bool {
        self.thread_id == Some(std::thread::current().id())
    }

    /// Request termination and wait for the worker to exit.
    ///
    /// Called from the worker itself, this only requests termination.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if self.is_worker_thread() {
            return;
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("[PeriodicTask::stop] {} worker panicked", self.name);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

fn periodic_loop<F>(rx: &Receiver<Command>, mut period: Duration, mut body: F, runs: &AtomicU64)
where
    F: FnMut() -> TaskControl,
{
    let mut next = Instant::now();
    let mut suspended = false;
    loop {
        // Commands queued while the body overran are handled before the next run.
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                Command::Stop => return,
                Command::Suspend => suspended = true,
                Command::Resume => {
                    if suspended {
                        suspended = false;
                        next = Instant::now();
                    }
                }
                Command::SetPeriod(p) => {
                    next = next.checked_sub(period).unwrap_or(next) + p;
                    period = p;
                }
                Command::Signal => {}
            }
        }

        if suspended {
            match rx.recv() {
                Ok(Command::Resume) => {
                    suspended = false;
                    next = Instant::now();
                }
                Ok(Command::SetPeriod(p)) => period = p,
                Ok(Command::Stop) | Err(_) => return,
                Ok(Command::Signal | Command::Suspend) => {}
            }
            continue;
        }

        let now = Instant::now();
        if now < next {
            match rx.recv_timeout(next - now) {
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(Command::Suspend) => {
                    suspended = true;
                    continue;
                }
                Ok(Command::SetPeriod(p)) => {
                    next = next.checked_sub(period).unwrap_or(now) + p;
                    period = p;
                    continue;
                }
                Ok(Command::Signal | Command::Resume) => continue,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        let control = body();
        runs.fetch_add(1, Ordering::AcqRel);
        if control == TaskControl::Stop {
            return;
        }

        next += period;
        let now = Instant::now();
        if next < now {
            // Overran: do not try to catch up on missed ticks.
            next = now;
        }
    }
}

fn signalled_loop<F>(rx: &Receiver<Command>, mut body: F, runs: &AtomicU64)
where
    F: FnMut() -> TaskControl,
{
    let mut suspended = false;
    loop {
        match rx.recv() {
            Ok(Command::Signal) => {
                // Coalesce signals that arrived while the body was running.
                let mut stop = false;
                while let Ok(cmd) = rx.try_recv() {
                    match cmd {
                        Command::Stop => stop = true,
                        Command::Suspend => suspended = true,
                        Command::Resume => suspended = false,
                        Command::Signal | Command::SetPeriod(_) => {}
                    }
                }
                if stop {
                    return;
                }
                if suspended {
                    continue;
                }
                let control = body();
                runs.fetch_add(1, Ordering::AcqRel);
                if control == TaskControl::Stop {
                    return;
                }
            }
            Ok(Command::Suspend) => suspended = true,
            Ok(Command::Resume) => suspended = false,
            Ok(Command::SetPeriod(_)) => {}
            Ok(Command::Stop) | Err(_) => return,
        }
    }
}
