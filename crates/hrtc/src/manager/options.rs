// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Manager command-line options.

use crate::error::{RtcError, RtcResult};
use clap::Parser;
use std::path::PathBuf;

/// Options accepted by [`Manager::init`](super::Manager::init).
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "rtcd")]
#[command(about = "RT-Component manager")]
pub struct ManagerOptions {
    /// Configuration file
    #[arg(short = 'f', value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Module to load at startup (repeatable)
    #[arg(short = 'l', value_name = "MODULE")]
    pub modules: Vec<String>,

    /// Override one configuration key, as key:value (repeatable)
    #[arg(short = 'o', value_name = "KEY:VALUE")]
    pub overrides: Vec<String>,

    /// Ignore configuration files and use built-in defaults
    #[arg(short = 'd')]
    pub use_defaults: bool,
}

impl ManagerOptions {
    /// Parse `argv` (program name first).
    pub fn parse_args<I, T>(argv: I) -> RtcResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(argv).map_err(|e| RtcError::bad_param(e.to_string()))
    }

    /// Overrides split into `(key, value)` at the first `:`.
    pub fn override_pairs(&self) -> RtcResult<Vec<(String, String)>> {
        self.overrides
            .iter()
            .map(|o| {
                let (k, v) = o
                    .split_once(':')
                    .ok_or_else(|| {
                        RtcError::bad_param(format!("-o expects key:value, got '{}'", o))
                    })?;
                let k = k.trim();
                if k.is_empty() {
                    return Err(RtcError::bad_param(format!("empty key in '{}'", o)));
                }
                Ok((k.to_string(), v.trim().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let opts = ManagerOptions::parse_args([
            "rtcd", "-f", "my.conf", "-l", "Echo.so", "-l", "Gain", "-o", "naming.enable:NO",
            "-o", "logger.log_level: DEBUG", "-d",
        ])
        .expect("parse");
        assert_eq!(opts.config_file, Some(PathBuf::from("my.conf")));
        assert_eq!(opts.modules, vec!["Echo.so".to_string(), "Gain".to_string()]);
        assert!(opts.use_defaults);
        let pairs = opts.override_pairs().expect("pairs");
        assert_eq!(pairs[1], ("logger.log_level".to_string(), "DEBUG".to_string()));
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(matches!(
            ManagerOptions::parse_args(["rtcd", "-x"]),
            Err(RtcError::BadParameter(_))
        ));
    }

    #[test]
    fn test_override_without_colon_rejected() {
        let opts = ManagerOptions::parse_args(["rtcd", "-o", "novalue"]).expect("parse");
        assert!(opts.override_pairs().is_err());
    }

    #[test]
    fn test_value_may_contain_colons() {
        let opts =
            ManagerOptions::parse_args(["rtcd", "-o", "corba.endpoint:host:2809"]).expect("parse");
        assert_eq!(
            opts.override_pairs().expect("pairs")[0].1,
            "host:2809".to_string()
        );
    }
}
