// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device discovery and connection tool for tether devices.
//!
//! Usage:
//!   tether list
//!   tether status -d "usb@/2E8A/000A//E6614103E7"
//!   tether bootloader --retries 20 -v
//!   tether ping --quarantine --transport serial

mod cli;
mod commands;
mod enumerate;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    cli::run(args)
}
