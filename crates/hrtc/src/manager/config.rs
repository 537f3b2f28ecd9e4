// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Manager configuration: built-in defaults, file lookup, overrides.
//!
//! Precedence, lowest first:
//!
//! 1. [`DEFAULT_CONFIG`] and host information (`manager.os.*`, `manager.pid`)
//! 2. the configuration file: `-f`, else `$RTC_MANAGER_CONFIG`, else the
//!    first existing entry of [`CONFIG_SEARCH_PATH`] (skipped with `-d`)
//! 3. `-o key:value` overrides

use super::options::ManagerOptions;
use crate::error::{RtcError, RtcResult};
use crate::properties::{split_csv, Properties};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RTC_MANAGER_CONFIG";

/// Files tried in order when neither `-f` nor the environment names one.
pub const CONFIG_SEARCH_PATH: &[&str] = &[
    "./rtc.conf",
    "/etc/rtc.conf",
    "/etc/rtc/rtc.conf",
    "/usr/local/etc/rtc.conf",
    "/usr/local/etc/rtc/rtc.conf",
];

/// Built-in defaults as a flat `[key, value, ...]` list.
pub const DEFAULT_CONFIG: &[&str] = &[
    "config.version",                   "1.2.0",
    "manager.name",                     "manager",
    "manager.instance_name",            "manager",
    "manager.shutdown_on_nortcs",       "NO",
    "manager.components.precreate",     "",
    "manager.modules.load_path",        "./",
    "manager.modules.config_path",      "",
    "manager.modules.abs_path_allowed", "YES",
    "manager.modules.download_allowed", "NO",
    "manager.modules.init_func_suffix", "Init",
    "manager.modules.init_func_prefix", "",
    "manager.modules.preload",          "",
    "naming.enable",                    "YES",
    "naming.type",                      "local",
    "naming.formats",                   "%h.host_cxt/%n.rtc",
    "naming.update.enable",             "YES",
    "naming.update.interval",           "10.0",
    "timer.enable",                     "YES",
    "timer.tick",                       "0.1",
    "logger.enable",                    "YES",
    "logger.file_name",                 "./rtc%p.log",
    "logger.date_format",               "%b %d %H:%M:%S",
    "logger.log_level",                 "INFO",
    "exec_cxt.periodic.type",           "PeriodicExecutionContext",
    "exec_cxt.periodic.rate",           "1000",
    "exec_cxt.sync_transition",         "YES",
    "exec_cxt.transition_timeout",      "0.5",
];

/// Build the manager configuration for `opts`.
pub fn load_configuration(opts: &ManagerOptions) -> RtcResult<Properties> {
    let mut prop = Properties::from_defaults(DEFAULT_CONFIG);
    set_system_info(&mut prop);

    if !opts.use_defaults {
        if let Some(path) = find_config_file(opts)? {
            let text = std::fs::read_to_string(&path)?;
            prop.load(&text);
            prop.set_property("manager.config_file", &path.to_string_lossy());
            log::debug!("[ManagerConfig] loaded {}", path.display());
        }
    }

    if !opts.modules.is_empty() {
        let mut preload = split_csv(prop.get_property("manager.modules.preload"));
        preload.extend(opts.modules.iter().cloned());
        prop.set_property("manager.modules.preload", &preload.join(","));
    }

    for (key, value) in opts.override_pairs()? {
        prop.set_property(&key, &value);
    }
    Ok(prop)
}

fn find_config_file(opts: &ManagerOptions) -> RtcResult<Option<PathBuf>> {
    if let Some(file) = &opts.config_file {
        if file.is_file() {
            return Ok(Some(file.clone()));
        }
        return Err(RtcError::bad_param(format!(
            "configuration file {} not found",
            file.display()
        )));
    }
    if let Ok(env) = std::env::var(CONFIG_ENV) {
        let path = Path::new(&env);
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        log::warn!("[ManagerConfig] {}={} does not exist", CONFIG_ENV, env);
    }
    Ok(CONFIG_SEARCH_PATH
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf))
}

/// Fill `manager.os.*` and `manager.pid`.
pub fn set_system_info(prop: &mut Properties) {
    prop.set_property("manager.pid", &std::process::id().to_string());
    if let Some(info) = uname() {
        prop.set_property("manager.os.name", &info.sysname);
        prop.set_property("manager.os.hostname", &info.nodename);
        prop.set_property("manager.os.release", &info.release);
        prop.set_property("manager.os.version", &info.version);
        prop.set_property("manager.os.arch", &info.machine);
    }
}

struct HostInfo {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
}

#[cfg(unix)]
fn uname() -> Option<HostInfo> {
    // SAFETY:
    // - utsname is a POD type that can be safely zero-initialized
    // - All fields are arrays of c_char, which have no invalid bit patterns
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    // SAFETY:
    // - &mut uts is a valid pointer to a properly sized utsname struct
    // - uname() writes NUL-terminated strings into every field on success
    let ret = unsafe { libc::uname(&mut uts) };
    if ret < 0 {
        return None;
    }
    let field = |f: &[libc::c_char]| {
        // SAFETY:
        // - uname() succeeded, so f holds a NUL-terminated C string
        // - uts lives on this stack frame for the duration of the call
        unsafe { std::ffi::CStr::from_ptr(f.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    };
    Some(HostInfo {
        sysname: field(&uts.sysname),
        nodename: field(&uts.nodename),
        release: field(&uts.release),
        version: field(&uts.version),
        machine: field(&uts.machine),
    })
}

#[cfg(not(unix))]
fn uname() -> Option<HostInfo> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn opts(args: &[&str]) -> ManagerOptions {
        let mut argv = vec!["rtcd"];
        argv.extend_from_slice(args);
        ManagerOptions::parse_args(argv).expect("parse")
    }

    #[test]
    fn test_defaults_and_system_info() {
        let prop = load_configuration(&opts(&["-d"])).expect("config");
        assert_eq!(prop.get_property("exec_cxt.periodic.rate"), "1000");
        assert_eq!(prop.get_property("naming.type"), "local");
        assert_eq!(
            prop.get_property("manager.pid"),
            std::process::id().to_string()
        );
        #[cfg(unix)]
        assert!(!prop.get_property("manager.os.name").is_empty());
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp");
        writeln!(file, "# test config").expect("write");
        writeln!(file, "exec_cxt.periodic.rate: 250").expect("write");
        writeln!(file, "naming.enable: NO").expect("write");
        let path = file.path().to_string_lossy().to_string();

        let prop = load_configuration(&opts(&["-f", &path, "-o", "naming.enable:YES"]))
            .expect("config");
        assert_eq!(prop.get_property("exec_cxt.periodic.rate"), "250");
        assert_eq!(prop.get_property("naming.enable"), "YES");
        assert_eq!(prop.get_property("manager.config_file"), path);
    }

    #[test]
    fn test_use_defaults_ignores_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp");
        writeln!(file, "exec_cxt.periodic.rate: 250").expect("write");
        let path = file.path().to_string_lossy().to_string();
        let prop = load_configuration(&opts(&["-d", "-f", &path])).expect("config");
        assert_eq!(prop.get_property("exec_cxt.periodic.rate"), "1000");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_configuration(&opts(&["-f", "/nonexistent/rtc.conf"])).is_err());
    }

    #[test]
    fn test_modules_appended_to_preload() {
        let prop = load_configuration(&opts(&["-d", "-l", "Echo", "-l", "Gain"])).expect("config");
        assert_eq!(prop.get_property("manager.modules.preload"), "Echo,Gain");
    }
}
