// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error and status types shared by every runtime subsystem.
//!
//! Operations on components, execution contexts, ports and the manager return
//! [`RtcResult`]. The remote-facing status enum [`ReturnCode`] is derived from an
//! error with [`RtcError::code`], so callers that need the coarse status (for
//! instance to report it over a management interface) never have to match on
//! every variant.

use thiserror::Error;

/// Status codes of the component management surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// Success.
    Ok,
    /// Generic failure.
    Error,
    /// Caller-supplied argument invalid (empty id, unknown set, wrong polarity).
    BadParameter,
    /// Feature not implemented by this port or execution context variant.
    Unsupported,
    /// Buffer full, worker thread unavailable, instance limit reached.
    OutOfResources,
    /// Lifecycle or state-machine precondition failed.
    PreconditionNotMet,
}

impl ReturnCode {
    /// Upper-case name as used in logs and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "RTC_OK",
            Self::Error => "RTC_ERROR",
            Self::BadParameter => "BAD_PARAMETER",
            Self::Unsupported => "UNSUPPORTED",
            Self::OutOfResources => "OUT_OF_RESOURCES",
            Self::PreconditionNotMet => "PRECONDITION_NOT_MET",
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<&RtcResult<T>> for ReturnCode {
    fn from(result: &RtcResult<T>) -> Self {
        match result {
            Ok(_) => ReturnCode::Ok,
            Err(e) => e.code(),
        }
    }
}

/// Errors returned by runtime operations.
#[derive(Debug, Error)]
pub enum RtcError {
    /// Generic failure reported by a component callback or a peer.
    #[error("operation failed")]
    Error,

    /// Caller-supplied argument invalid.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// Requested feature not implemented by this variant.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Resource exhausted (buffer, instances, threads).
    #[error("out of resources: {0}")]
    OutOfResources(String),

    /// Lifecycle or state precondition failed.
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// A bounded wait elapsed.
    #[error("timed out")]
    Timeout,

    /// The transport reported an unrecoverable failure.
    #[error("connection lost")]
    ConnectionLost,

    /// Internal invariant violated (includes panics caught in callbacks).
    #[error("internal error: {0}")]
    Internal(String),

    /// Named object (factory, component, module, configuration set) not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O failure (configuration files, log files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RtcError {
    /// Shorthand for [`RtcError::BadParameter`].
    pub fn bad_param(msg: impl Into<String>) -> Self {
        Self::BadParameter(msg.into())
    }

    /// Shorthand for [`RtcError::PreconditionNotMet`].
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionNotMet(msg.into())
    }

    /// Map onto the coarse management status code.
    pub fn code(&self) -> ReturnCode {
        match self {
            Self::Error | Self::Timeout | Self::ConnectionLost | Self::Internal(_) => {
                ReturnCode::Error
            }
            Self::BadParameter(_) | Self::NotFound(_) => ReturnCode::BadParameter,
            Self::Unsupported(_) => ReturnCode::Unsupported,
            Self::OutOfResources(_) => ReturnCode::OutOfResources,
            Self::PreconditionNotMet(_) => ReturnCode::PreconditionNotMet,
            Self::Io(_) => ReturnCode::Error,
        }
    }
}

/// Result alias used across the crate.
pub type RtcResult<T> = Result<T, RtcError>;
