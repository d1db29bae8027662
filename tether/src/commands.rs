// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use tether_common::{
    ConnectError, Connected, DeviceAddress, DeviceEnumerator, FirmwareMode, Progress,
    TransportKind,
};

use crate::cli::{ConnectConfig, Coordinator};

/// List enumerated candidates, marking blacklisted and non-matching ones.
pub fn list(coordinator: &Coordinator, device: &str) -> Result<()> {
    let spec = DeviceAddress::parse(device).context("Invalid --device address")?;
    let candidates = coordinator.enumerator().enumerate(spec.transport());

    if candidates.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    for candidate in &candidates {
        let text = candidate.format();
        let marker = if coordinator.blacklist().contains(&text) {
            "  [blacklisted]"
        } else if !spec.matches(candidate) {
            "  [no match]"
        } else {
            ""
        };
        println!("{}{}", text, marker);
    }

    Ok(())
}

/// Probe every candidate and report which ones answer.
pub fn ping(
    coordinator: &mut Coordinator,
    transport: Option<TransportKind>,
    quarantine: bool,
) -> Result<()> {
    let results = coordinator.ping_all(transport, quarantine);

    if results.is_empty() {
        println!("No devices to ping.");
        return Ok(());
    }

    let mut silent = 0;
    for result in &results {
        if result.responded {
            println!("{}  OK", result.address);
        } else {
            silent += 1;
            println!(
                "{}  no response{}",
                result.address,
                if result.quarantined { " (blacklisted)" } else { "" }
            );
        }
    }
    println!();
    println!("{} of {} device(s) responded.", results.len() - silent, results.len());

    Ok(())
}

/// Connect and print what the device reported.
pub fn status(coordinator: &mut Coordinator, device: &str, config: &ConnectConfig) -> Result<()> {
    let connected = connect(coordinator, device, config)?;
    let info = &connected.info;

    println!("Device Status:");
    println!("  Address:   {}", info.address);
    println!("  Mode:      {}", mode_name(info.mode));
    println!("  Serial:    {}", info.serial_number);
    println!("  Firmware:  {}", info.firmware_version);
    println!("  Protocol:  v{}", info.protocol_version);
    println!("  Attempts:  {}", connected.attempts);

    coordinator.disconnect();
    Ok(())
}

/// Connect and restart the device into its normal firmware.
pub fn reset(coordinator: &mut Coordinator, device: &str, config: &ConnectConfig) -> Result<()> {
    let connected = connect(coordinator, device, config)?;
    println!(
        "Resetting {} ({})...",
        connected.info.address,
        mode_name(connected.info.mode)
    );

    coordinator.reset().context("Reset failed")?;
    println!("Device is restarting.");
    Ok(())
}

/// Connect and restart the device into its bootloader.
pub fn bootloader(coordinator: &mut Coordinator, device: &str, config: &ConnectConfig) -> Result<()> {
    let connected = connect(coordinator, device, config)?;
    if connected.info.is_bootloader() {
        println!("{} is already in bootloader mode.", connected.info.address);
        coordinator.disconnect();
        return Ok(());
    }

    println!("Restarting {} into bootloader...", connected.info.address);
    coordinator
        .reset_to_bootloader()
        .context("Bootloader request failed")?;
    println!("Device is restarting. Reconnect once it re-enumerates.");
    Ok(())
}

/// Print the blacklist.
pub fn blacklist_show(coordinator: &Coordinator) -> Result<()> {
    let entries = coordinator.blacklist().snapshot();
    if entries.is_empty() {
        println!("Blacklist is empty.");
        return Ok(());
    }

    println!("Blacklisted devices:");
    for entry in entries {
        println!("  {}", entry);
    }
    Ok(())
}

/// Empty the blacklist.
pub fn blacklist_clear(coordinator: &mut Coordinator) -> Result<()> {
    let removed = coordinator.blacklist().len();
    coordinator
        .blacklist_mut()
        .clear()
        .context("Failed to save blacklist")?;
    println!("Removed {} blacklisted device(s).", removed);
    Ok(())
}

/// Retry until a device matching `device` accepts the handshake.
fn connect(coordinator: &mut Coordinator, device: &str, config: &ConnectConfig) -> Result<Connected> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let started = Instant::now();
    let deadline = config.wait;
    let result = coordinator.connect(device, config.policy, |attempt, _| {
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            return Progress::Abort;
        }
        pb.set_message(format!("Looking for device (attempt {})", attempt));
        Progress::Continue
    });

    match result {
        Ok(connected) => {
            pb.finish_and_clear();
            log::info!(
                "Connected to {} after {} attempt(s)",
                connected.info.address,
                connected.attempts
            );
            Ok(connected)
        }
        Err(e) => {
            pb.abandon();
            Err(describe_connect_error(e))
        }
    }
}

fn describe_connect_error(error: ConnectError) -> anyhow::Error {
    match error {
        ConnectError::InvalidAddress(e) => anyhow!(e).context("Invalid --device address"),
        ConnectError::Aborted { attempts } => {
            anyhow!("Connect stopped by user after {} attempt(s)", attempts)
        }
        ConnectError::NoCandidatesFound { attempts } => {
            anyhow!("No device found after {} attempt(s)", attempts)
        }
        ConnectError::Transport { attempts, source } => {
            anyhow!(source).context(format!(
                "Could not connect after {} attempt(s); last error",
                attempts
            ))
        }
    }
}

fn mode_name(mode: FirmwareMode) -> &'static str {
    match mode {
        FirmwareMode::Normal => "normal",
        FirmwareMode::Bootloader => "bootloader",
    }
}
