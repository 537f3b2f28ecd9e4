// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging output backends (console and file).
//!
//! Implementations are thread-safe; the file backend serializes writers with a
//! mutex around the handle.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};

/// Runtime log levels, ordered from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Nothing is written.
    Silent = 0,
    /// Only messages that must always be emitted (errors).
    Mandatory = 1,
    /// Error conditions.
    Error = 2,
    /// Potentially harmful situations.
    Warn = 3,
    /// General operational information.
    Info = 4,
    /// Normal-volume runtime chatter (state changes, connections).
    Normal = 5,
    /// Development information.
    Debug = 6,
    /// Function-level tracing.
    Trace = 7,
    /// Per-tick and per-sample detail.
    Verbose = 8,
    /// Everything.
    Paranoid = 9,
}

impl LogLevel {
    /// Upper-case name as written to the log and accepted by `logger.log_level`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "SILENT",
            Self::Mandatory => "MANDATORY",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Normal => "NORMAL",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Verbose => "VERBOSE",
            Self::Paranoid => "PARANOID",
        }
    }

    /// Parse a level name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        let level = match name.trim().to_ascii_uppercase().as_str() {
            "SILENT" => Self::Silent,
            "MANDATORY" => Self::Mandatory,
            "ERROR" | "FATAL" => Self::Error,
            "WARN" | "WARNING" => Self::Warn,
            "INFO" => Self::Info,
            "NORMAL" => Self::Normal,
            "DEBUG" => Self::Debug,
            "TRACE" => Self::Trace,
            "VERBOSE" => Self::Verbose,
            "PARANOID" => Self::Paranoid,
            _ => return None,
        };
        Some(level)
    }

    /// Level assigned to a record emitted through the `log` facade.
    pub fn from_record(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }

    /// Coarsest `log` facade filter that lets this level through.
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Silent => log::LevelFilter::Off,
            Self::Mandatory | Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info | Self::Normal => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace | Self::Verbose | Self::Paranoid => log::LevelFilter::Trace,
        }
    }
}

/// Output destination for formatted log lines.
pub trait Output: Send + Sync {
    /// Write one formatted line (without trailing newline).
    fn write(&self, level: LogLevel, line: &str) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&self) -> io::Result<()>;
}

/// Console stream selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Console output implementation.
pub struct ConsoleOutput {
    stream: ConsoleStream,
}

impl ConsoleOutput {
    /// Create a console output on the given stream.
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }
}

impl Output for ConsoleOutput {
    fn write(&self, _level: LogLevel, line: &str) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => writeln!(io::stdout().lock(), "{}", line),
            ConsoleStream::Stderr => writeln!(io::stderr().lock(), "{}", line),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }
}

/// File output implementation (append mode).
pub struct FileOutput {
    file: Mutex<std::fs::File>,
}

impl FileOutput {
    /// Open (or create) the log file at `path` for appending.
    pub fn new(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Output for FileOutput {
    fn write(&self, _level: LogLevel, line: &str) -> io::Result<()> {
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Silent < LogLevel::Error);
        assert!(LogLevel::Info < LogLevel::Normal);
        assert!(LogLevel::Normal < LogLevel::Debug);
        assert!(LogLevel::Verbose < LogLevel::Paranoid);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("PARANOID"), Some(LogLevel::Paranoid));
        assert_eq!(LogLevel::parse("chatty"), None);
        assert_eq!(LogLevel::Normal.to_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_file_output_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rtc.log");
        let path = path.to_string_lossy().to_string();
        let out = FileOutput::new(&path).expect("open log");
        out.write(LogLevel::Info, "first").expect("write");
        out.write(LogLevel::Info, "second").expect("write");
        out.flush().expect("flush");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(text, "first\nsecond\n");
    }
}
