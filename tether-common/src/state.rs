// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Connection state machine - pure logic without transport dependencies.
//!
//! The session drives this FSM with the events it observes on the link
//! (handshake result, explicit close, I/O failure, device-issued reset).
//! Keeping the transition table free of I/O lets it be tested on its own
//! and shared with firmware-side tooling.

use crate::protocol::FirmwareMode;

/// State of the (single) device connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    ConnectedNormal,
    ConnectedBootloader,
}

impl ConnectionState {
    /// State reached after a successful handshake in `mode`.
    pub fn from_mode(mode: FirmwareMode) -> Self {
        match mode {
            FirmwareMode::Normal => ConnectionState::ConnectedNormal,
            FirmwareMode::Bootloader => ConnectionState::ConnectedBootloader,
        }
    }

    pub fn is_connected(self) -> bool {
        self != ConnectionState::Disconnected
    }

    pub fn is_bootloader(self) -> bool {
        self == ConnectionState::ConnectedBootloader
    }
}

/// Events observed by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake completed; the device reported this mode.
    Opened(FirmwareMode),
    /// Handshake failed.
    OpenFailed,
    /// Caller closed the session.
    Closed,
    /// The link failed while connected.
    TransportFailed,
    /// The device accepted a reset request and is leaving the bus.
    ModeTransition,
}

/// Compute the state following `event`.
///
/// Returns `None` when the event is not valid in `state` (for example a
/// handshake on an already-open session); the caller keeps its state.
pub fn next_state(state: ConnectionState, event: SessionEvent) -> Option<ConnectionState> {
    use ConnectionState::*;

    match (state, event) {
        (Disconnected, SessionEvent::Opened(mode)) => Some(ConnectionState::from_mode(mode)),
        (Disconnected, SessionEvent::OpenFailed) => Some(Disconnected),
        // close() is idempotent
        (Disconnected, SessionEvent::Closed) => Some(Disconnected),
        (Disconnected, SessionEvent::TransportFailed | SessionEvent::ModeTransition) => None,

        (ConnectedNormal | ConnectedBootloader, SessionEvent::Opened(_)) => None,
        (ConnectedNormal | ConnectedBootloader, SessionEvent::OpenFailed) => None,
        (
            ConnectedNormal | ConnectedBootloader,
            SessionEvent::Closed | SessionEvent::TransportFailed | SessionEvent::ModeTransition,
        ) => Some(Disconnected),
    }
}

/// Whether `event` is accepted in `state`.
pub fn accepts(state: ConnectionState, event: SessionEvent) -> bool {
    next_state(state, event).is_some()
}
