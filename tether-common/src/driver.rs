// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Seams to the platform: enumeration and byte-level links.
//!
//! The core never talks to the OS directly. The host tool supplies a
//! [`DeviceEnumerator`] per platform and a [`DeviceDriver`] that opens
//! USB or serial links; tests supply fakes.

use crate::address::{DeviceAddress, TransportKind};
use crate::error::TransportError;
use crate::protocol::{Command, FirmwareMode, Response};

/// Lists the devices currently visible to the OS.
pub trait DeviceEnumerator {
    /// Candidates for `filter` (all transports if `None`).
    ///
    /// Every returned address must be full. No ordering is guaranteed.
    /// Must be cheap and free of side effects on the devices.
    fn enumerate(&self, filter: Option<TransportKind>) -> Vec<DeviceAddress>;
}

impl<T: DeviceEnumerator + ?Sized> DeviceEnumerator for Box<T> {
    fn enumerate(&self, filter: Option<TransportKind>) -> Vec<DeviceAddress> {
        (**self).enumerate(filter)
    }
}

/// An open byte channel to one device.
///
/// Dropping the link closes it.
pub trait DeviceLink {
    /// Send `command` and wait for the device's response.
    fn request(&mut self, command: &Command) -> Result<Response, TransportError>;
}

/// Opens links to concrete addresses.
pub trait DeviceDriver {
    fn open_link(&self, address: &DeviceAddress) -> Result<Box<dyn DeviceLink>, TransportError>;

    /// Lightweight liveness check: open, ping, close.
    fn probe(&self, address: &DeviceAddress) -> bool {
        match self.open_link(address) {
            Ok(mut link) => match link.request(&Command::Ping) {
                Ok(Response::Pong) => true,
                Ok(other) => {
                    log::debug!("{address}: unexpected ping response {other:?}");
                    false
                }
                Err(e) => {
                    log::debug!("{address}: ping failed: {e}");
                    false
                }
            },
            Err(e) => {
                log::debug!("{address}: open failed: {e}");
                false
            }
        }
    }
}

impl<T: DeviceDriver + ?Sized> DeviceDriver for Box<T> {
    fn open_link(&self, address: &DeviceAddress) -> Result<Box<dyn DeviceLink>, TransportError> {
        (**self).open_link(address)
    }

    fn probe(&self, address: &DeviceAddress) -> bool {
        (**self).probe(address)
    }
}

/// Per-attempt handshake options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Accept devices that answer with the legacy protocol version.
    pub allow_legacy_protocol: bool,
}

/// What the device reported when the session was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: DeviceAddress,
    pub mode: FirmwareMode,
    pub serial_number: String,
    pub firmware_version: u32,
    pub protocol_version: u16,
}

impl ConnectionInfo {
    pub fn is_bootloader(&self) -> bool {
        self.mode == FirmwareMode::Bootloader
    }
}
