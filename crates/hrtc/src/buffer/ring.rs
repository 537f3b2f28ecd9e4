// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-length ring of payload slots.
//!
//! The ring tracks a read position, a write position and a fill count. Every
//! slot also carries a freshness flag that is raised on write and cleared when
//! the slot is read or skipped, which is what [`Buffer::is_new`] reports.

use super::{Buffer, BufferConfig, BufferStatus, EmptyPolicy, FullPolicy};
use crate::cdr::ByteData;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
struct Slot {
    data: Option<ByteData>,
    fresh: bool,
}

#[derive(Debug)]
struct Ring {
    slots: Vec<Slot>,
    rpos: usize,
    wpos: usize,
    fill: usize,
    /// Last entry handed out by `read`, served again under the readback policy.
    last: Option<ByteData>,
}

impl Ring {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn step(&self, pos: usize, n: isize) -> usize {
        let len = self.len() as isize;
        ((pos as isize + n).rem_euclid(len)) as usize
    }

    fn push(&mut self, data: ByteData) {
        let wpos = self.wpos;
        self.slots[wpos] = Slot {
            data: Some(data),
            fresh: true,
        };
        self.wpos = self.step(wpos, 1);
        self.fill += 1;
    }

    fn pop(&mut self) -> Option<ByteData> {
        if self.fill == 0 {
            return None;
        }
        let rpos = self.rpos;
        let slot = &mut self.slots[rpos];
        slot.fresh = false;
        let data = slot.data.clone();
        self.rpos = self.step(rpos, 1);
        self.fill -= 1;
        if data.is_some() {
            self.last = data.clone();
        }
        data
    }
}

/// Default [`Buffer`] implementation.
pub struct RingBuffer {
    config: BufferConfig,
    ring: Mutex<Ring>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl RingBuffer {
    /// Create a ring with `config.length` slots (at least one).
    pub fn new(config: BufferConfig) -> Self {
        let len = config.length.max(1);
        Self {
            ring: Mutex::new(Ring {
                slots: vec![Slot::default(); len],
                rpos: 0,
                wpos: 0,
                fill: 0,
                last: None,
            }),
            config: BufferConfig {
                length: len,
                ..config
            },
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Parameters the ring was built with.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Wait on `cv` until `ready` holds or `timeout` elapses.
    fn wait_until<F>(
        cv: &Condvar,
        ring: &mut MutexGuard<'_, Ring>,
        timeout: Option<Duration>,
        ready: F,
    ) -> bool
    where
        F: Fn(&Ring) -> bool,
    {
        match timeout {
            None => {
                while !ready(&**ring) {
                    cv.wait(ring);
                }
                true
            }
            Some(t) => {
                let deadline = Instant::now() + t;
                while !ready(&**ring) {
                    if cv.wait_until(ring, deadline).timed_out() {
                        return ready(&**ring);
                    }
                }
                true
            }
        }
    }

    fn write_inner(&self, data: ByteData, timeout: Option<Duration>) -> BufferStatus {
        let mut ring = self.ring.lock();
        if ring.fill == ring.len() {
            match self.config.full_policy {
                FullPolicy::Overwrite => {
                    // Drop the oldest entry to make room.
                    let rpos = ring.rpos;
                    ring.slots[rpos].fresh = false;
                    ring.rpos = ring.step(rpos, 1);
                    ring.fill -= 1;
                }
                FullPolicy::DoNothing => return BufferStatus::Full,
                FullPolicy::Block => {
                    let ok = Self::wait_until(&self.not_full, &mut ring, timeout, |r| {
                        r.fill < r.len()
                    });
                    if !ok {
                        log::debug!("[RingBuffer::write] timed out waiting for a free slot");
                        return BufferStatus::Timeout;
                    }
                }
            }
        }
        ring.push(data);
        drop(ring);
        self.not_empty.notify_all();
        BufferStatus::Ok
    }

    fn read_inner(&self, timeout: Option<Duration>) -> Result<ByteData, BufferStatus> {
        let mut ring = self.ring.lock();
        if ring.fill == 0 {
            match self.config.empty_policy {
                EmptyPolicy::Readback => {
                    return ring.last.clone().ok_or(BufferStatus::Empty);
                }
                EmptyPolicy::DoNothing => return Err(BufferStatus::Empty),
                EmptyPolicy::Block => {
                    let ok = Self::wait_until(&self.not_empty, &mut ring, timeout, |r| r.fill > 0);
                    if !ok {
                        log::debug!("[RingBuffer::read] timed out waiting for data");
                        return Err(BufferStatus::Timeout);
                    }
                }
            }
        }
        let data = ring.pop();
        drop(ring);
        self.not_full.notify_all();
        data.ok_or(BufferStatus::Error)
    }
}

impl Buffer for RingBuffer {
    fn length(&self) -> usize {
        self.config.length
    }

    fn reset(&self) {
        let mut ring = self.ring.lock();
        let len = ring.len();
        ring.slots = vec![Slot::default(); len];
        ring.rpos = 0;
        ring.wpos = 0;
        ring.fill = 0;
        ring.last = None;
        drop(ring);
        self.not_full.notify_all();
    }

    fn write(&self, data: ByteData) -> BufferStatus {
        self.write_inner(data, self.config.write_timeout)
    }

    fn write_within(&self, data: ByteData, timeout: Option<Duration>) -> BufferStatus {
        self.write_inner(data, timeout)
    }

    fn read(&self) -> Result<ByteData, BufferStatus> {
        self.read_inner(self.config.read_timeout)
    }

    fn read_within(&self, timeout: Option<Duration>) -> Result<ByteData, BufferStatus> {
        self.read_inner(timeout)
    }

    fn get(&self) -> Option<ByteData> {
        let ring = self.ring.lock();
        if ring.fill == 0 {
            return None;
        }
        ring.slots[ring.rpos].data.clone()
    }

    fn advance_read_ptr(&self, n: isize) -> BufferStatus {
        let mut ring = self.ring.lock();
        let readable = ring.fill as isize;
        let writable = (ring.len() - ring.fill) as isize;
        if n > readable || -n > writable {
            return BufferStatus::PreconditionNotMet;
        }
        if n > 0 {
            for i in 0..n {
                let pos = ring.step(ring.rpos, i);
                ring.slots[pos].fresh = false;
                if let Some(data) = ring.slots[pos].data.clone() {
                    ring.last = Some(data);
                }
            }
        }
        ring.rpos = ring.step(ring.rpos, n);
        ring.fill = (readable - n) as usize;
        drop(ring);
        if n > 0 {
            self.not_full.notify_all();
        } else if n < 0 {
            self.not_empty.notify_all();
        }
        BufferStatus::Ok
    }

    fn advance_write_ptr(&self, n: isize) -> BufferStatus {
        let mut ring = self.ring.lock();
        let readable = ring.fill as isize;
        let writable = (ring.len() - ring.fill) as isize;
        if n > writable || -n > readable {
            return BufferStatus::PreconditionNotMet;
        }
        ring.wpos = ring.step(ring.wpos, n);
        ring.fill = (readable + n) as usize;
        drop(ring);
        if n > 0 {
            self.not_empty.notify_all();
        } else if n < 0 {
            self.not_full.notify_all();
        }
        BufferStatus::Ok
    }

    fn readable(&self) -> usize {
        self.ring.lock().fill
    }

    fn writable(&self) -> usize {
        let ring = self.ring.lock();
        ring.len() - ring.fill
    }

    fn is_new(&self) -> bool {
        let ring = self.ring.lock();
        ring.fill > 0 && ring.slots[ring.rpos].fresh
    }

    fn overwrites(&self) -> bool {
        self.config.full_policy == FullPolicy::Overwrite
    }
}
