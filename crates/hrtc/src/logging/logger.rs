// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global logger instance and initialization.
//!
//! The runtime logs through the `log` facade. This module provides the single
//! process-wide backend: it is installed on first use and reconfigured (outputs,
//! level, date format) by later [`init_logger`] calls, so a manager re-initialized
//! in the same process keeps logging to the right place.

use super::output::{LogLevel, Output};
use parking_lot::RwLock;
use std::io;
use std::sync::{Arc, OnceLock};

static LOGGER: OnceLock<RtcLogger> = OnceLock::new();

/// Backend state behind the `log` facade.
struct LoggerState {
    outputs: Vec<Arc<dyn Output>>,
    level: LogLevel,
    date_format: String,
    name: String,
}

/// `log::Log` implementation dispatching to the configured outputs.
pub struct RtcLogger {
    state: RwLock<LoggerState>,
}

impl RtcLogger {
    fn new() -> Self {
        Self {
            state: RwLock::new(LoggerState {
                outputs: Vec::new(),
                level: LogLevel::Info,
                date_format: "%b %d %H:%M:%S".to_string(),
                name: "manager".to_string(),
            }),
        }
    }

    fn format_line(state: &LoggerState, level: LogLevel, target: &str, message: &str) -> String {
        let stamp = chrono::Local::now().format(&state.date_format);
        format!(
            "{} {}: {}.{}: {}",
            stamp,
            level.as_str(),
            state.name,
            target,
            message
        )
    }
}

impl log::Log for RtcLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        let state = self.state.read();
        let level = LogLevel::from_record(metadata.level());
        if state.level == LogLevel::Mandatory {
            return level <= LogLevel::Error;
        }
        level <= state.level && !state.outputs.is_empty()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let state = self.state.read();
        let level = LogLevel::from_record(record.level());
        let line = Self::format_line(&state, level, record.target(), &record.args().to_string());
        for out in &state.outputs {
            // A failing sink must never take the runtime down.
            let _ = out.write(level, &line);
        }
    }

    fn flush(&self) {
        let state = self.state.read();
        for out in &state.outputs {
            let _ = out.flush();
        }
    }
}

/// Install (or reconfigure) the global logger.
///
/// Returns `true` when this call installed the backend into the `log` facade.
/// When another logger was installed by the host application first, the
/// runtime keeps using that one and this returns `false`.
pub fn init_logger(
    outputs: Vec<Arc<dyn Output>>,
    level: LogLevel,
    date_format: &str,
    name: &str,
) -> bool {
    let mut installed_now = false;
    let logger = LOGGER.get_or_init(|| {
        installed_now = true;
        RtcLogger::new()
    });
    {
        let mut state = logger.state.write();
        state.outputs = outputs;
        state.level = level;
        if !date_format.is_empty() {
            state.date_format = date_format.to_string();
        }
        state.name = name.to_string();
    }
    if installed_now && log::set_logger(logger).is_err() {
        return false;
    }
    log::set_max_level(level.to_filter());
    installed_now
}

/// Change the level filter of the installed logger.
pub fn set_log_level(level: LogLevel) {
    if let Some(logger) = LOGGER.get() {
        logger.state.write().level = level;
        log::set_max_level(level.to_filter());
    }
}

/// Current level filter (INFO when the logger was never initialized).
pub fn log_level() -> LogLevel {
    LOGGER.get().map_or(LogLevel::Info, |l| l.state.read().level)
}

/// Flush every output of the global logger.
///
/// Safe to call even if the logger was never initialized.
pub fn flush_logger() -> io::Result<()> {
    if let Some(logger) = LOGGER.get() {
        let state = logger.state.read();
        for out in &state.outputs {
            out.flush()?;
        }
    }
    Ok(())
}

/// Detach all outputs (used on manager shutdown).
pub fn close_logger() -> io::Result<()> {
    flush_logger()?;
    if let Some(logger) = LOGGER.get() {
        logger.state.write().outputs.clear();
    }
    Ok(())
}
