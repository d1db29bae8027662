// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use tether_common::protocol::{AckStatus, Command, DeviceHello, FirmwareMode, Response};
use tether_common::{
    DeviceAddress, DeviceDriver, DeviceEnumerator, DeviceLink, TransportError, TransportKind,
    PROTOCOL_VERSION,
};

pub fn addr(text: &str) -> DeviceAddress {
    DeviceAddress::parse(text).expect("test address must parse")
}

pub fn hello(mode: FirmwareMode, serial: &str, protocol_version: u16) -> DeviceHello {
    let mut serial_number = heapless::String::new();
    serial_number.push_str(serial).expect("serial fits");
    DeviceHello {
        protocol_version,
        mode,
        serial_number,
        firmware_version: 7,
    }
}

// =============================================================================
// Enumerator
// =============================================================================

/// Returns one scripted list per call; the last list repeats.
#[derive(Default)]
pub struct ScriptedEnumerator {
    rounds: Vec<Vec<DeviceAddress>>,
    calls: Cell<usize>,
    filters: RefCell<Vec<Option<TransportKind>>>,
}

impl ScriptedEnumerator {
    pub fn new(rounds: Vec<Vec<DeviceAddress>>) -> Self {
        Self {
            rounds,
            ..Self::default()
        }
    }

    /// Always returns `devices`.
    pub fn fixed(devices: Vec<DeviceAddress>) -> Self {
        Self::new(vec![devices])
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn filters(&self) -> Vec<Option<TransportKind>> {
        self.filters.borrow().clone()
    }
}

impl DeviceEnumerator for ScriptedEnumerator {
    fn enumerate(&self, filter: Option<TransportKind>) -> Vec<DeviceAddress> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        self.filters.borrow_mut().push(filter);

        let round = match self.rounds.get(call) {
            Some(round) => round.clone(),
            None => self.rounds.last().cloned().unwrap_or_default(),
        };
        round
            .into_iter()
            .filter(|a| filter.is_none() || a.transport() == filter)
            .collect()
    }
}

// =============================================================================
// Driver
// =============================================================================

/// How a fake device behaves when a link is opened.
#[derive(Clone)]
pub enum FakeDevice {
    /// Answers the handshake with this hello.
    Answers(DeviceHello),
    /// Answers the handshake, then fails every later request.
    Flaky(DeviceHello),
    /// Answers the first link opened to it; every later link is silent.
    AnswersOnce(DeviceHello),
    /// The link cannot be opened.
    Absent,
    /// The link opens but nothing answers.
    Silent,
}

#[derive(Default)]
pub struct FakeDriver {
    devices: HashMap<String, FakeDevice>,
    opened: RefCell<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, device: FakeDevice) -> Self {
        self.devices.insert(address.to_string(), device);
        self
    }

    pub fn normal(self, address: &str, serial: &str) -> Self {
        self.with(
            address,
            FakeDevice::Answers(hello(FirmwareMode::Normal, serial, PROTOCOL_VERSION)),
        )
    }

    pub fn bootloader(self, address: &str, serial: &str) -> Self {
        self.with(
            address,
            FakeDevice::Answers(hello(FirmwareMode::Bootloader, serial, PROTOCOL_VERSION)),
        )
    }

    fn open_count(&self, address: &str) -> usize {
        self.opened.borrow().iter().filter(|a| *a == address).count()
    }

    /// Every address passed to `open_link`, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl DeviceDriver for FakeDriver {
    fn open_link(&self, address: &DeviceAddress) -> Result<Box<dyn DeviceLink>, TransportError> {
        let text = address.format();
        self.opened.borrow_mut().push(text.clone());

        match self.devices.get(&text).cloned().unwrap_or(FakeDevice::Absent) {
            FakeDevice::Absent => Err(TransportError::OpenFailed {
                address: text,
                message: "no such device".to_string(),
            }),
            FakeDevice::Answers(hello) => Ok(Box::new(FakeLink {
                hello,
                fail_after_handshake: false,
                silent: false,
                requests: 0,
            })),
            FakeDevice::Flaky(hello) => Ok(Box::new(FakeLink {
                hello,
                fail_after_handshake: true,
                silent: false,
                requests: 0,
            })),
            FakeDevice::AnswersOnce(hello) if self.open_count(&text) == 1 => {
                Ok(Box::new(FakeLink {
                    hello,
                    fail_after_handshake: false,
                    silent: false,
                    requests: 0,
                }))
            }
            FakeDevice::Silent | FakeDevice::AnswersOnce(_) => Ok(Box::new(FakeLink {
                hello: hello(FirmwareMode::Normal, "", PROTOCOL_VERSION),
                fail_after_handshake: false,
                silent: true,
                requests: 0,
            })),
        }
    }
}

pub struct FakeLink {
    hello: DeviceHello,
    fail_after_handshake: bool,
    silent: bool,
    requests: usize,
}

impl DeviceLink for FakeLink {
    fn request(&mut self, command: &Command) -> Result<Response, TransportError> {
        self.requests += 1;
        if self.silent {
            return Err(TransportError::Timeout);
        }
        if self.fail_after_handshake && self.requests > 1 {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device went away",
            )));
        }

        Ok(match command {
            Command::Hello { .. } => Response::Hello(self.hello.clone()),
            Command::Ping => Response::Pong,
            Command::Reset | Command::ResetToBootloader => Response::Ack(AckStatus::Ok),
        })
    }
}

// =============================================================================
// Delay
// =============================================================================

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits: Vec<Duration>,
}

impl RecordingDelay {
    pub fn total(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl tether_common::Delay for RecordingDelay {
    fn wait(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}
