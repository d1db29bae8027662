// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device addressing and resilient connection core for tether.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - `no_std` (default features off): only the wire protocol and the
//!   connection state machine, for firmware that answers the handshake
//! - `std` feature (default): addressing, blacklist, settings, session and
//!   the retrying connect used by the host tool

#![cfg_attr(not(feature = "std"), no_std)]

pub mod protocol;
pub mod state;

#[cfg(feature = "std")]
pub mod address;
#[cfg(feature = "std")]
pub mod blacklist;
#[cfg(feature = "std")]
pub mod driver;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
pub mod retry;
#[cfg(feature = "std")]
pub mod session;
#[cfg(feature = "std")]
pub mod settings;

// Re-export commonly used types
pub use protocol::{AckStatus, Command, DeviceHello, FirmwareMode, Response};
pub use protocol::{LEGACY_PROTOCOL_VERSION, MAX_FRAME_SIZE, MAX_SERIAL_LEN, PROTOCOL_VERSION};
pub use state::{ConnectionState, SessionEvent};

#[cfg(feature = "std")]
pub use address::{DeviceAddress, TransportKind, UsbSelector};
#[cfg(feature = "std")]
pub use blacklist::Blacklist;
#[cfg(feature = "std")]
pub use driver::{ConnectionInfo, DeviceDriver, DeviceEnumerator, DeviceLink, OpenOptions};
#[cfg(feature = "std")]
pub use error::{
    AddressError, ConnectError, InvalidReason, SessionError, SettingsError, TransportError,
};
#[cfg(feature = "std")]
pub use retry::{
    Connected, Delay, PingResult, Progress, RetryCoordinator, RetryPolicy, SessionAffinity,
    ThreadDelay,
};
#[cfg(feature = "std")]
pub use session::ConnectionSession;
#[cfg(feature = "std")]
pub use settings::{ConnectDefaults, SettingsDocument};
