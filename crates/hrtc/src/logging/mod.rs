// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime logging backend.
//!
//! Library code logs through the `log` facade with a `[Type::method]` prefix:
//!
//! ```ignore
//! log::debug!("[PortBase::connect] connector {} established", id);
//! ```
//!
//! The manager installs the backend from its configuration (`logger.enable`,
//! `logger.file_name`, `logger.log_level`, `logger.date_format`). Applications
//! that install their own `log` implementation first keep it; the runtime then
//! only adjusts the facade's max level.

pub mod logger;
mod output;

pub use logger::{close_logger, flush_logger, init_logger, log_level, set_log_level};
pub use output::{ConsoleOutput, ConsoleStream, FileOutput, LogLevel, Output};

use std::sync::Arc;

/// Build the output for a `logger.file_name` entry.
///
/// `stdout`/`stderr` (any case) select the console; `%p` expands to the pid.
pub fn output_for(file_name: &str) -> std::io::Result<Arc<dyn Output>> {
    let name = file_name.trim();
    match name.to_ascii_lowercase().as_str() {
        "stdout" => Ok(Arc::new(ConsoleOutput::new(ConsoleStream::Stdout))),
        "stderr" | "" => Ok(Arc::new(ConsoleOutput::new(ConsoleStream::Stderr))),
        _ => {
            let path = name.replace("%p", &std::process::id().to_string());
            Ok(Arc::new(FileOutput::new(&path)?))
        }
    }
}
