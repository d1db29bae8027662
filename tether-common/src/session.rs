// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! A single device connection and its handshake.

use crate::address::DeviceAddress;
use crate::driver::{ConnectionInfo, DeviceDriver, DeviceLink, OpenOptions};
use crate::error::{SessionError, TransportError};
use crate::protocol::{AckStatus, Command, Response, LEGACY_PROTOCOL_VERSION, PROTOCOL_VERSION};
use crate::state::{next_state, ConnectionState, SessionEvent};

/// Tracks the open link (if any) and the [`ConnectionState`].
pub struct ConnectionSession<D> {
    driver: D,
    state: ConnectionState,
    link: Option<Box<dyn DeviceLink>>,
    info: Option<ConnectionInfo>,
}

impl<D: DeviceDriver> ConnectionSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: ConnectionState::Disconnected,
            link: None,
            info: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_bootloader(&self) -> bool {
        self.state.is_bootloader()
    }

    /// Handshake result of the current connection.
    pub fn info(&self) -> Option<&ConnectionInfo> {
        self.info.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Liveness check. Does not change the session state.
    pub fn probe(&self, address: &DeviceAddress) -> bool {
        self.driver.probe(address)
    }

    /// Open a link to `address` and perform the handshake.
    pub fn open(
        &mut self,
        address: &DeviceAddress,
        options: OpenOptions,
    ) -> Result<ConnectionInfo, TransportError> {
        if self.is_connected() {
            log::warn!(
                "Opening {} while already connected; closing previous session",
                address
            );
            self.close();
        }

        match self.handshake(address, options) {
            Ok((link, info)) => {
                log::info!(
                    "Connected to {} ({:?} mode, serial {}, firmware {})",
                    info.address,
                    info.mode,
                    info.serial_number,
                    info.firmware_version
                );
                self.apply(SessionEvent::Opened(info.mode));
                self.link = Some(link);
                self.info = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                self.apply(SessionEvent::OpenFailed);
                Err(e)
            }
        }
    }

    /// Drop the link. Idempotent.
    pub fn close(&mut self) {
        self.disconnect_with(SessionEvent::Closed);
    }

    /// Send `command` on the open link.
    ///
    /// A transport failure closes the session.
    pub fn request(&mut self, command: &Command) -> Result<Response, SessionError> {
        let link = self.link.as_mut().ok_or(SessionError::NotConnected)?;

        match link.request(command) {
            Ok(response) => Ok(response),
            Err(e) => {
                log::warn!("Link failure during {:?}: {}", command, e);
                self.disconnect_with(SessionEvent::TransportFailed);
                Err(e.into())
            }
        }
    }

    /// Ask the device to restart into its normal firmware.
    ///
    /// The device leaves the bus; the new mode is seen on the next connection.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.mode_transition(Command::Reset)
    }

    /// Ask the device to restart into its bootloader.
    pub fn reset_to_bootloader(&mut self) -> Result<(), SessionError> {
        self.mode_transition(Command::ResetToBootloader)
    }

    fn mode_transition(&mut self, command: Command) -> Result<(), SessionError> {
        match self.request(&command)? {
            Response::Ack(AckStatus::Ok) => {
                self.disconnect_with(SessionEvent::ModeTransition);
                Ok(())
            }
            Response::Ack(status) => Err(TransportError::Refused(status).into()),
            other => Err(TransportError::UnexpectedResponse(format!("{other:?}")).into()),
        }
    }

    fn handshake(
        &self,
        address: &DeviceAddress,
        options: OpenOptions,
    ) -> Result<(Box<dyn DeviceLink>, ConnectionInfo), TransportError> {
        let mut link = self.driver.open_link(address)?;

        let hello = match link.request(&Command::Hello {
            protocol_version: PROTOCOL_VERSION,
        })? {
            Response::Hello(hello) => hello,
            other => return Err(TransportError::UnexpectedResponse(format!("{other:?}"))),
        };
        check_protocol(hello.protocol_version, options)?;

        let info = ConnectionInfo {
            address: address.clone(),
            mode: hello.mode,
            serial_number: hello.serial_number.as_str().to_string(),
            firmware_version: hello.firmware_version,
            protocol_version: hello.protocol_version,
        };
        Ok((link, info))
    }

    fn disconnect_with(&mut self, event: SessionEvent) {
        self.link = None;
        self.info = None;
        self.apply(event);
    }

    fn apply(&mut self, event: SessionEvent) {
        match next_state(self.state, event) {
            Some(state) => self.state = state,
            None => log::debug!("Ignoring {:?} in state {:?}", event, self.state),
        }
    }
}

fn check_protocol(version: u16, options: OpenOptions) -> Result<(), TransportError> {
    match version {
        PROTOCOL_VERSION => Ok(()),
        LEGACY_PROTOCOL_VERSION if options.allow_legacy_protocol => {
            log::debug!("Accepting legacy protocol v{}", version);
            Ok(())
        }
        LEGACY_PROTOCOL_VERSION => Err(TransportError::LegacyNotAllowed(version)),
        found => Err(TransportError::UnsupportedProtocol {
            found,
            expected: PROTOCOL_VERSION,
        }),
    }
}
