// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types for the connection core.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::AckStatus;

/// A device address that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid device address `{text}`: {reason}")]
pub struct AddressError {
    pub text: String,
    pub reason: InvalidReason,
}

impl AddressError {
    pub(crate) fn new(text: &str, reason: InvalidReason) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("usb selector must start with `/`")]
    MissingSeparator,
    #[error("too many segments (usb addresses have at most {max})")]
    TooManySegments { max: usize },
    #[error("{field} is not a hexadecimal value")]
    NotHex { field: &'static str },
    #[error("{field} is wider than {digits} hex digits")]
    TooWide { field: &'static str, digits: usize },
}

/// Failure of a single transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {address}: {message}")]
    OpenFailed { address: String, message: String },
    #[error("timed out waiting for response")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Frame(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("device speaks protocol v{found}, expected v{expected}")]
    UnsupportedProtocol { found: u16, expected: u16 },
    #[error("device speaks legacy protocol v{0} (legacy protocol not allowed)")]
    LegacyNotAllowed(u16),
    #[error("device refused command: {0:?}")]
    Refused(AckStatus),
}

/// Errors from operations on an open session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no device connected")]
    NotConnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors reading or writing the workspace settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid `{key}` in {}: {source}", path.display())]
    Value {
        path: PathBuf,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} is not a JSON object", path.display())]
    NotAnObject { path: PathBuf },
}

/// Outcome of a failed `connect`.
///
/// `attempts` counts the enumeration rounds that were performed.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("no matching device found after {attempts} attempt(s)")]
    NoCandidatesFound { attempts: u32 },
    #[error("could not connect after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },
    #[error("connection aborted after {attempts} attempt(s)")]
    Aborted { attempts: u32 },
}

impl ConnectError {
    /// Number of rounds performed before giving up (0 for invalid addresses).
    pub fn attempts(&self) -> u32 {
        match self {
            ConnectError::InvalidAddress(_) => 0,
            ConnectError::NoCandidatesFound { attempts }
            | ConnectError::Transport { attempts, .. }
            | ConnectError::Aborted { attempts } => *attempts,
        }
    }
}
