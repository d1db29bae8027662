// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Handshake protocol shared by the host tool and device firmware.
//!
//! This module provides types that work in both `no_std` (embedded) and `std` (host) environments.
//! Frames are postcard-encoded and COBS-framed with a trailing `0x00` delimiter.

use serde::{Deserialize, Serialize};

// --- Protocol versions ---

/// Protocol version spoken by this host.
pub const PROTOCOL_VERSION: u16 = 2;

/// Older protocol still accepted when the caller allows it.
pub const LEGACY_PROTOCOL_VERSION: u16 = 1;

/// Maximum length of a device serial number string.
pub const MAX_SERIAL_LEN: usize = 32;

/// Maximum size of one encoded frame, delimiter included.
pub const MAX_FRAME_SIZE: usize = 128;

// --- Command / Response protocol ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a session; the device answers with [`Response::Hello`].
    Hello { protocol_version: u16 },
    /// Liveness check, answered with [`Response::Pong`].
    Ping,
    /// Restart into the normal firmware.
    Reset,
    /// Restart into the bootloader.
    ResetToBootloader,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Hello(DeviceHello),
    Pong,
    Ack(AckStatus),
}

/// Identity reported by the device during the handshake.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceHello {
    pub protocol_version: u16,
    pub mode: FirmwareMode,
    pub serial_number: heapless::String<MAX_SERIAL_LEN>,
    pub firmware_version: u32,
}

/// Which firmware image answered the handshake.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareMode {
    Normal,
    Bootloader,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    BadCommand,
    BadState,
}
