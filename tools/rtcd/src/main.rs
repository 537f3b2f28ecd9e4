// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rtcd - RT-Component daemon
//!
//! Boots a manager from `rtc.conf` and the command line, creates the
//! components listed in `manager.components.precreate` and runs until
//! Ctrl-C or until the manager terminates itself.
//!
//! ```text
//! rtcd -f ./rtc.conf -o logger.log_level:DEBUG
//! rtcd -d -l Echo -o manager.components.precreate:Echo
//! ```

use anyhow::Context;
use clap::Parser;
use hrtc::{Manager, ManagerOptions};
use std::process::ExitCode;
use std::sync::Arc;

fn run() -> anyhow::Result<()> {
    // Validates the command line (and serves --help) before anything starts.
    let opts = ManagerOptions::parse();

    let mgr = Manager::init(std::env::args()).context("manager initialization failed")?;
    log::debug!("[rtcd] options {:?}", opts);

    let weak = Arc::downgrade(&mgr);
    ctrlc::set_handler(move || {
        if let Some(mgr) = weak.upgrade() {
            log::info!("[rtcd] interrupted, shutting down");
            mgr.terminate();
        }
    })
    .context("cannot install Ctrl-C handler")?;

    mgr.activate_manager().context("manager activation failed")?;
    mgr.run_manager(true).context("manager event loop failed")?;
    mgr.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rtcd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
