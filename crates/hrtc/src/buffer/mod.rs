// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector buffers.
//!
//! Every connector owns one buffer of serialized payloads. The buffer type is
//! chosen by the `buffer_type` connector property (`ring_buffer` is the only
//! built-in type) and its behaviour by the `buffer.*` keys:
//!
//! ```text
//! buffer_length             8
//! buffer.write.full_policy  overwrite | do_nothing | block
//! buffer.write.timeout      seconds (negative = wait forever)
//! buffer.read.empty_policy  last | do_nothing | block
//! buffer.read.timeout       seconds (negative = wait forever)
//! ```
//!
//! Timeouts default to zero, so a buffer never suspends its caller unless a
//! blocking policy and a timeout are both configured.

mod ring;

pub use ring::RingBuffer;

use crate::cdr::ByteData;
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use std::sync::Arc;
use std::time::Duration;

/// Default number of slots.
pub const DEFAULT_BUFFER_LENGTH: usize = 8;

/// Name of the built-in buffer type.
pub const RING_BUFFER: &str = "ring_buffer";

/// Result of a buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferStatus {
    Ok,
    Empty,
    Full,
    Timeout,
    PreconditionNotMet,
    Error,
}

impl BufferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "BUFFER_OK",
            Self::Empty => "BUFFER_EMPTY",
            Self::Full => "BUFFER_FULL",
            Self::Timeout => "TIMEOUT",
            Self::PreconditionNotMet => "PRECONDITION_NOT_MET",
            Self::Error => "BUFFER_ERROR",
        }
    }
}

impl std::fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `write` does when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullPolicy {
    /// Drop the oldest unread entry.
    #[default]
    Overwrite,
    /// Wait for a free slot up to the write timeout.
    Block,
    /// Return [`BufferStatus::Full`] immediately.
    DoNothing,
}

impl FullPolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "block" => Some(Self::Block),
            "do_nothing" => Some(Self::DoNothing),
            _ => None,
        }
    }
}

/// What `read` does when no unread entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// Return the most recently read entry again.
    #[default]
    Readback,
    /// Wait for an entry up to the read timeout.
    Block,
    /// Return [`BufferStatus::Empty`] immediately.
    DoNothing,
}

impl EmptyPolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "last" | "readback" => Some(Self::Readback),
            "block" => Some(Self::Block),
            "do_nothing" => Some(Self::DoNothing),
            _ => None,
        }
    }
}

/// Buffer construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    pub length: usize,
    pub full_policy: FullPolicy,
    /// `None` waits forever.
    pub write_timeout: Option<Duration>,
    pub empty_policy: EmptyPolicy,
    /// `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_BUFFER_LENGTH,
            full_policy: FullPolicy::default(),
            write_timeout: Some(Duration::ZERO),
            empty_policy: EmptyPolicy::default(),
            read_timeout: Some(Duration::ZERO),
        }
    }
}

impl BufferConfig {
    /// Read the `buffer_length` / `buffer.*` keys of a connector profile.
    ///
    /// `buffer.length` is accepted as an alias of `buffer_length`.
    pub fn from_properties(prop: &Properties) -> RtcResult<Self> {
        let mut cfg = Self::default();

        let length = match prop.get_property("buffer_length") {
            "" => prop.get_property("buffer.length"),
            v => v,
        };
        if !length.is_empty() {
            cfg.length = length
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| RtcError::bad_param(format!("invalid buffer_length '{}'", length)))?;
        }

        let full = prop.get_property("buffer.write.full_policy");
        if !full.is_empty() {
            cfg.full_policy = FullPolicy::parse(full)
                .ok_or_else(|| RtcError::bad_param(format!("unknown full_policy '{}'", full)))?;
        }
        let empty = prop.get_property("buffer.read.empty_policy");
        if !empty.is_empty() {
            cfg.empty_policy = EmptyPolicy::parse(empty)
                .ok_or_else(|| RtcError::bad_param(format!("unknown empty_policy '{}'", empty)))?;
        }

        cfg.write_timeout = parse_timeout(prop.get_property("buffer.write.timeout"))?;
        cfg.read_timeout = parse_timeout(prop.get_property("buffer.read.timeout"))?;
        Ok(cfg)
    }
}

fn parse_timeout(value: &str) -> RtcResult<Option<Duration>> {
    if value.trim().is_empty() {
        return Ok(Some(Duration::ZERO));
    }
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| RtcError::bad_param(format!("invalid timeout '{}'", value)))?;
    if !secs.is_finite() {
        return Err(RtcError::bad_param(format!("invalid timeout '{}'", value)));
    }
    if secs < 0.0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_secs_f64(secs)))
    }
}

/// Bounded store of serialized payloads shared by a connector and its
/// publisher or provider.
///
/// All methods are thread-safe.
pub trait Buffer: Send + Sync {
    /// Number of slots.
    fn length(&self) -> usize;

    /// Drop every entry.
    fn reset(&self);

    /// Append `data` using the configured full policy and write timeout.
    fn write(&self, data: ByteData) -> BufferStatus;

    /// Like [`write`](Self::write) with an explicit timeout (`None` = forever).
    fn write_within(&self, data: ByteData, timeout: Option<Duration>) -> BufferStatus;

    /// Take the oldest unread entry using the configured empty policy.
    ///
    /// The error side never carries [`BufferStatus::Ok`].
    fn read(&self) -> Result<ByteData, BufferStatus>;

    /// Like [`read`](Self::read) with an explicit timeout (`None` = forever).
    fn read_within(&self, timeout: Option<Duration>) -> Result<ByteData, BufferStatus>;

    /// Entry at the read pointer, without consuming it.
    fn get(&self) -> Option<ByteData>;

    /// Move the read pointer by `n` slots (negative rewinds).
    fn advance_read_ptr(&self, n: isize) -> BufferStatus;

    /// Move the write pointer by `n` slots (negative rewinds).
    fn advance_write_ptr(&self, n: isize) -> BufferStatus;

    /// Unread entries.
    fn readable(&self) -> usize;

    /// Free slots. Always `length() - readable()`.
    fn writable(&self) -> usize;

    fn empty(&self) -> bool {
        self.readable() == 0
    }

    fn full(&self) -> bool {
        self.writable() == 0
    }

    /// True when the entry at the read pointer has not been read since it was written.
    fn is_new(&self) -> bool;

    /// True when writing to a full buffer drops the oldest entry.
    fn overwrites(&self) -> bool;
}

/// Instantiate the buffer named by `buffer_type` (empty selects the ring buffer).
pub fn create_buffer(buffer_type: &str, config: BufferConfig) -> RtcResult<Arc<dyn Buffer>> {
    match buffer_type.trim() {
        "" | RING_BUFFER => Ok(Arc::new(RingBuffer::new(config))),
        other => Err(RtcError::Unsupported(format!("buffer type '{}'", other))),
    }
}

/// Build the buffer described by a connector profile's properties.
pub fn buffer_from_properties(prop: &Properties) -> RtcResult<Arc<dyn Buffer>> {
    let config = BufferConfig::from_properties(prop)?;
    create_buffer(prop.get_property("buffer_type"), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = BufferConfig::from_properties(&Properties::new()).expect("config");
        assert_eq!(cfg, BufferConfig::default());
        assert_eq!(cfg.length, 8);
        assert_eq!(cfg.write_timeout, Some(Duration::ZERO));
    }

    #[test]
    fn test_config_from_connector_keys() {
        let prop = Properties::from_pairs(&[
            ("buffer_length", "3"),
            ("buffer.write.full_policy", "block"),
            ("buffer.write.timeout", "0.25"),
            ("buffer.read.empty_policy", "do_nothing"),
            ("buffer.read.timeout", "-1"),
        ]);
        let cfg = BufferConfig::from_properties(&prop).expect("config");
        assert_eq!(cfg.length, 3);
        assert_eq!(cfg.full_policy, FullPolicy::Block);
        assert_eq!(cfg.write_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cfg.empty_policy, EmptyPolicy::DoNothing);
        assert_eq!(cfg.read_timeout, None);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let zero = Properties::from_pairs(&[("buffer_length", "0")]);
        assert!(BufferConfig::from_properties(&zero).is_err());
        let policy = Properties::from_pairs(&[("buffer.write.full_policy", "explode")]);
        assert!(BufferConfig::from_properties(&policy).is_err());
    }

    #[test]
    fn test_unknown_buffer_type_unsupported() {
        let res = create_buffer("shm_buffer", BufferConfig::default());
        assert!(matches!(res, Err(RtcError::Unsupported(_))));
        let ring = create_buffer(RING_BUFFER, BufferConfig::default()).expect("ring");
        assert_eq!(ring.length(), 8);
    }
}
