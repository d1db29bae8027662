// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the connection state machine.

use tether_common::protocol::FirmwareMode;
use tether_common::state::{accepts, next_state, ConnectionState, SessionEvent};

const CONNECTED: [ConnectionState; 2] = [
    ConnectionState::ConnectedNormal,
    ConnectionState::ConnectedBootloader,
];

// =============================================================================
// ConnectionState helpers
// =============================================================================

#[test]
fn test_initial_state_is_disconnected() {
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
}

#[test]
fn test_from_mode() {
    assert_eq!(
        ConnectionState::from_mode(FirmwareMode::Normal),
        ConnectionState::ConnectedNormal
    );
    assert_eq!(
        ConnectionState::from_mode(FirmwareMode::Bootloader),
        ConnectionState::ConnectedBootloader
    );
}

#[test]
fn test_is_connected_and_is_bootloader() {
    assert!(!ConnectionState::Disconnected.is_connected());
    assert!(ConnectionState::ConnectedNormal.is_connected());
    assert!(ConnectionState::ConnectedBootloader.is_connected());

    assert!(!ConnectionState::Disconnected.is_bootloader());
    assert!(!ConnectionState::ConnectedNormal.is_bootloader());
    assert!(ConnectionState::ConnectedBootloader.is_bootloader());
}

// =============================================================================
// Transitions from Disconnected
// =============================================================================

#[test]
fn test_open_normal() {
    assert_eq!(
        next_state(
            ConnectionState::Disconnected,
            SessionEvent::Opened(FirmwareMode::Normal)
        ),
        Some(ConnectionState::ConnectedNormal)
    );
}

#[test]
fn test_open_bootloader() {
    assert_eq!(
        next_state(
            ConnectionState::Disconnected,
            SessionEvent::Opened(FirmwareMode::Bootloader)
        ),
        Some(ConnectionState::ConnectedBootloader)
    );
}

#[test]
fn test_open_failure_stays_disconnected() {
    assert_eq!(
        next_state(ConnectionState::Disconnected, SessionEvent::OpenFailed),
        Some(ConnectionState::Disconnected)
    );
}

#[test]
fn test_close_is_idempotent() {
    assert_eq!(
        next_state(ConnectionState::Disconnected, SessionEvent::Closed),
        Some(ConnectionState::Disconnected)
    );
}

#[test]
fn test_disconnected_rejects_link_events() {
    assert!(!accepts(
        ConnectionState::Disconnected,
        SessionEvent::TransportFailed
    ));
    assert!(!accepts(
        ConnectionState::Disconnected,
        SessionEvent::ModeTransition
    ));
}

// =============================================================================
// Transitions from connected states
// =============================================================================

#[test]
fn test_connected_states_leave_on_close_failure_or_reset() {
    for state in CONNECTED {
        for event in [
            SessionEvent::Closed,
            SessionEvent::TransportFailed,
            SessionEvent::ModeTransition,
        ] {
            assert_eq!(
                next_state(state, event),
                Some(ConnectionState::Disconnected),
                "{state:?} + {event:?}"
            );
        }
    }
}

#[test]
fn test_connected_states_reject_second_open() {
    for state in CONNECTED {
        assert_eq!(
            next_state(state, SessionEvent::Opened(FirmwareMode::Normal)),
            None
        );
        assert_eq!(next_state(state, SessionEvent::OpenFailed), None);
    }
}

#[test]
fn test_no_direct_normal_to_bootloader_transition() {
    // Mode changes are only observed through a new connection.
    for event in [
        SessionEvent::Opened(FirmwareMode::Bootloader),
        SessionEvent::ModeTransition,
    ] {
        assert_ne!(
            next_state(ConnectionState::ConnectedNormal, event),
            Some(ConnectionState::ConnectedBootloader)
        );
    }
}
