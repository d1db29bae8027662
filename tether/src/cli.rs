// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tether_common::{
    Blacklist, ConnectDefaults, OpenOptions, RetryCoordinator, RetryPolicy, SettingsDocument,
    TransportKind,
};

use crate::commands;
use crate::enumerate::{default_enumerator, SystemEnumerator};
use crate::transport::HostDriver;

/// Coordinator wired to the host enumerator and links.
pub type Coordinator = RetryCoordinator<SystemEnumerator, HostDriver>;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Discover and connect to tether devices over USB or serial")]
pub struct Cli {
    /// Device address: "usb@/VID/PID/IF/SERIAL", "serial@PATH" or empty for any
    #[arg(short, long, global = true, default_value = "")]
    pub device: String,

    /// Retries after the first connect round (overrides settings)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Delay between connect rounds in milliseconds (overrides settings)
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Accept devices speaking the legacy protocol version
    #[arg(long, global = true)]
    pub legacy: bool,

    /// Give up connecting after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub wait: Option<u64>,

    /// Directory holding the .tether settings folder
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List candidate devices
    List,

    /// Ping every candidate device
    Ping {
        /// Blacklist devices that do not answer
        #[arg(long)]
        quarantine: bool,

        /// Only probe one transport (usb or serial)
        #[arg(long, value_name = "TRANSPORT")]
        transport: Option<TransportKind>,
    },

    /// Connect and show what the device reports
    Status,

    /// Connect and restart the device into its firmware
    Reset,

    /// Connect and restart the device into its bootloader
    Bootloader,

    /// Inspect or clear the blacklist
    Blacklist {
        #[command(subcommand)]
        command: BlacklistCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlacklistCommands {
    /// Print blacklisted addresses
    Show,

    /// Remove every blacklisted address
    Clear,
}

/// Settings-backed defaults with command-line overrides applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectConfig {
    pub policy: RetryPolicy,
    pub options: OpenOptions,
    pub wait: Option<Duration>,
}

impl Cli {
    /// Merge the `connect` settings with the flags given on the command line.
    pub fn connect_config(&self, defaults: ConnectDefaults) -> ConnectConfig {
        let retries = self.retries.unwrap_or(defaults.retries);
        let delay_ms = self.delay_ms.unwrap_or(defaults.delay_ms);
        ConnectConfig {
            policy: RetryPolicy::from_millis(retries, delay_ms),
            options: OpenOptions {
                allow_legacy_protocol: self.legacy || defaults.allow_legacy_protocol,
            },
            wait: self.wait.map(Duration::from_secs),
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let settings = SettingsDocument::for_workspace(&cli.workspace)
        .context("Failed to read workspace settings")?;
    log::debug!("Using settings at {}", settings.path().display());

    let config = cli.connect_config(settings.connect_defaults()?);
    let blacklist = Blacklist::load(settings).context("Failed to load blacklist")?;
    let mut coordinator = Coordinator::new(default_enumerator(), HostDriver::default(), blacklist)
        .with_options(config.options);

    match cli.command {
        Commands::List => commands::list(&coordinator, &cli.device),
        Commands::Ping {
            quarantine,
            transport,
        } => commands::ping(&mut coordinator, transport, quarantine),
        Commands::Status => commands::status(&mut coordinator, &cli.device, &config),
        Commands::Reset => commands::reset(&mut coordinator, &cli.device, &config),
        Commands::Bootloader => commands::bootloader(&mut coordinator, &cli.device, &config),
        Commands::Blacklist { command } => match command {
            BlacklistCommands::Show => commands::blacklist_show(&coordinator),
            BlacklistCommands::Clear => commands::blacklist_clear(&mut coordinator),
        },
    }
}
