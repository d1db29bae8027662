// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resilient connect: enumerate, filter, attempt, wait, repeat.
//!
//! [`RetryCoordinator::connect`] turns "the device may not be plugged in yet,
//! and may come back under a different address" into one call. Each round
//! enumerates the candidates, drops blacklisted and non-matching ones and
//! tries to open the rest in enumeration order. The first successful
//! handshake ends the call. Between rounds the progress callback is asked
//! whether to continue; it is the only cancellation point.

use std::thread;
use std::time::Duration;

use crate::address::{DeviceAddress, TransportKind};
use crate::blacklist::Blacklist;
use crate::driver::{ConnectionInfo, DeviceDriver, DeviceEnumerator, OpenOptions};
use crate::error::{ConnectError, SessionError, TransportError};
use crate::session::ConnectionSession;

/// Default number of retries after the first round.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default delay between rounds, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 500;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first round; 0 means exactly one round.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_millis(retries: u32, delay_ms: u64) -> Self {
        Self::new(retries, Duration::from_millis(delay_ms))
    }

    /// A single round, no waiting.
    pub fn once() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Upper bound on the number of rounds.
    pub fn rounds(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY_MS)
    }
}

/// Answer from the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Abort,
}

/// Waits between rounds.
pub trait Delay {
    fn wait(&mut self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// The last device connected during this process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAffinity {
    pub address: DeviceAddress,
    pub serial_number: String,
}

impl SessionAffinity {
    /// Whether `candidate` looks like the remembered device.
    ///
    /// A USB device that re-enumerated (for instance into its bootloader)
    /// is recognised by its serial number.
    pub fn prefers(&self, candidate: &DeviceAddress) -> bool {
        if self.address.matches(candidate) {
            return true;
        }
        !self.serial_number.is_empty()
            && candidate.usb_serial_number() == Some(self.serial_number.as_str())
    }
}

/// Successful outcome of [`RetryCoordinator::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub info: ConnectionInfo,
    /// Round in which the connection succeeded (1-based).
    pub attempts: u32,
}

/// One line of a [`RetryCoordinator::ping_all`] sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingResult {
    pub address: DeviceAddress,
    pub responded: bool,
    /// Newly added to the blacklist by this sweep.
    pub quarantined: bool,
}

enum RoundOutcome {
    Connected(ConnectionInfo),
    Failed {
        matched: bool,
        error: Option<TransportError>,
    },
}

/// Owns the enumerator, the session and the blacklist for one process run.
pub struct RetryCoordinator<E, D, W = ThreadDelay> {
    enumerator: E,
    session: ConnectionSession<D>,
    blacklist: Blacklist,
    affinity: Option<SessionAffinity>,
    delay: W,
    options: OpenOptions,
}

impl<E, D> RetryCoordinator<E, D, ThreadDelay>
where
    E: DeviceEnumerator,
    D: DeviceDriver,
{
    pub fn new(enumerator: E, driver: D, blacklist: Blacklist) -> Self {
        Self {
            enumerator,
            session: ConnectionSession::new(driver),
            blacklist,
            affinity: None,
            delay: ThreadDelay,
            options: OpenOptions::default(),
        }
    }
}

impl<E, D, W> RetryCoordinator<E, D, W>
where
    E: DeviceEnumerator,
    D: DeviceDriver,
    W: Delay,
{
    /// Replace the inter-round wait.
    pub fn with_delay<V: Delay>(self, delay: V) -> RetryCoordinator<E, D, V> {
        RetryCoordinator {
            enumerator: self.enumerator,
            session: self.session,
            blacklist: self.blacklist,
            affinity: self.affinity,
            delay,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: OpenOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> OpenOptions {
        self.options
    }

    pub fn set_options(&mut self, options: OpenOptions) {
        self.options = options;
    }

    /// Parse `spec` and connect to the first matching device.
    ///
    /// `progress(round, total)` is called before the first round and before
    /// every retry; `total` is `None` because the policy is a ceiling, not
    /// a target. Returning [`Progress::Abort`] stops before the next
    /// enumeration.
    pub fn connect<F>(
        &mut self,
        spec: &str,
        policy: RetryPolicy,
        progress: F,
    ) -> Result<Connected, ConnectError>
    where
        F: FnMut(u32, Option<u32>) -> Progress,
    {
        let spec = DeviceAddress::parse(spec)?;
        self.connect_to(&spec, policy, progress)
    }

    /// Like [`connect`](Self::connect) with an already-parsed specification.
    pub fn connect_to<F>(
        &mut self,
        spec: &DeviceAddress,
        policy: RetryPolicy,
        mut progress: F,
    ) -> Result<Connected, ConnectError>
    where
        F: FnMut(u32, Option<u32>) -> Progress,
    {
        let preferred = if spec.is_any() {
            self.affinity.clone()
        } else {
            None
        };
        if let Some(affinity) = &preferred {
            log::debug!("Preferring previously connected {}", affinity.address);
        }

        let mut attempt: u32 = 0;
        let mut matched_any = false;
        let mut last_error = None;

        if progress(attempt.saturating_add(1), None) == Progress::Abort {
            return Err(ConnectError::Aborted { attempts: 0 });
        }

        loop {
            log::debug!("Connect round {} for `{}`", attempt.saturating_add(1), spec);

            match self.run_round(spec, preferred.as_ref()) {
                RoundOutcome::Connected(info) => {
                    self.affinity = Some(SessionAffinity {
                        address: info.address.clone(),
                        serial_number: info.serial_number.clone(),
                    });
                    return Ok(Connected {
                        info,
                        attempts: attempt.saturating_add(1),
                    });
                }
                RoundOutcome::Failed { matched, error } => {
                    matched_any |= matched;
                    if error.is_some() {
                        last_error = error;
                    }
                }
            }

            if attempt >= policy.max_attempts {
                break;
            }
            if progress(attempt.saturating_add(2), None) == Progress::Abort {
                log::info!("Connect aborted after {} round(s)", attempt.saturating_add(1));
                return Err(ConnectError::Aborted {
                    attempts: attempt.saturating_add(1),
                });
            }
            self.delay.wait(policy.delay);
            attempt += 1;
        }

        let attempts = attempt.saturating_add(1);
        match last_error {
            Some(source) if matched_any => Err(ConnectError::Transport { attempts, source }),
            _ => Err(ConnectError::NoCandidatesFound { attempts }),
        }
    }

    fn run_round(
        &mut self,
        spec: &DeviceAddress,
        preferred: Option<&SessionAffinity>,
    ) -> RoundOutcome {
        let blacklist = &self.blacklist;
        let mut eligible: Vec<DeviceAddress> = self
            .enumerator
            .enumerate(spec.transport())
            .into_iter()
            .filter(|candidate| {
                let text = candidate.format();
                if blacklist.contains(&text) {
                    log::debug!("Skipping blacklisted {}", text);
                    return false;
                }
                spec.matches(candidate)
            })
            .collect();

        // Stable: enumeration order is kept within each group.
        if let Some(affinity) = preferred {
            eligible.sort_by_key(|c| !affinity.prefers(c));
        }

        let matched = !eligible.is_empty();
        let mut error = None;
        for candidate in &eligible {
            match self.session.open(candidate, self.options) {
                Ok(info) => return RoundOutcome::Connected(info),
                Err(e) => {
                    log::debug!("Attempt on {} failed: {}", candidate, e);
                    error = Some(e);
                }
            }
        }
        RoundOutcome::Failed { matched, error }
    }

    /// Probe every enumerated, non-blacklisted device.
    ///
    /// With `quarantine_on_failure`, devices that do not answer are added to
    /// the blacklist. A blacklist that cannot be saved is logged and the
    /// sweep goes on; such devices are reported with `quarantined: false`.
    pub fn ping_all(
        &mut self,
        filter: Option<TransportKind>,
        quarantine_on_failure: bool,
    ) -> Vec<PingResult> {
        let mut results = Vec::new();

        for candidate in self.enumerator.enumerate(filter) {
            let text = candidate.format();
            if self.blacklist.contains(&text) {
                log::debug!("Skipping blacklisted {}", text);
                continue;
            }

            let responded = self.session.probe(&candidate);
            let quarantined = !responded && quarantine_on_failure && self.quarantine(&text);
            results.push(PingResult {
                address: candidate,
                responded,
                quarantined,
            });
        }

        results
    }

    fn quarantine(&mut self, text: &str) -> bool {
        match self.blacklist.add(text) {
            Ok(added) => {
                if added {
                    log::info!("Quarantined unresponsive {}", text);
                }
                added
            }
            Err(e) => {
                log::warn!("Could not quarantine {}: {}", text, e);
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn is_bootloader(&self) -> bool {
        self.session.is_bootloader()
    }

    pub fn disconnect(&mut self) {
        self.session.close();
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.session.reset()
    }

    pub fn reset_to_bootloader(&mut self) -> Result<(), SessionError> {
        self.session.reset_to_bootloader()
    }

    pub fn session(&self) -> &ConnectionSession<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ConnectionSession<D> {
        &mut self.session
    }

    pub fn enumerator(&self) -> &E {
        &self.enumerator
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn blacklist_mut(&mut self) -> &mut Blacklist {
        &mut self.blacklist
    }

    pub fn affinity(&self) -> Option<&SessionAffinity> {
        self.affinity.as_ref()
    }

    pub fn delay(&self) -> &W {
        &self.delay
    }
}
