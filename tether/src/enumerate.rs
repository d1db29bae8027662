// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Platform device enumeration.

use serialport::SerialPortInfo;

use tether_common::{DeviceAddress, DeviceEnumerator, TransportKind};

/// USB interface class used by tether devices.
pub const VENDOR_SPECIFIC_CLASS: u8 = 0xFF;

/// Lists vendor-specific USB interfaces, one candidate per interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsbEnumerator;

impl UsbEnumerator {
    pub fn scan(&self) -> Vec<DeviceAddress> {
        let devices = match nusb::list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                log::warn!("USB enumeration failed: {}", e);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for device in devices {
            let Some(serial) = usable_serial(device.serial_number()) else {
                log::trace!(
                    "Skipping {:04X}:{:04X}: serial number {:?} cannot be addressed",
                    device.vendor_id(),
                    device.product_id(),
                    device.serial_number()
                );
                continue;
            };

            for interface in device.interfaces() {
                if interface.class() != VENDOR_SPECIFIC_CLASS {
                    continue;
                }
                found.push(DeviceAddress::usb(
                    Some(device.vendor_id()),
                    Some(device.product_id()),
                    Some(interface.interface_number()),
                    Some(serial),
                ));
            }
        }
        found
    }
}

/// A candidate must be full and its text must parse back, so the serial
/// number has to be present and free of `/`.
fn usable_serial(serial: Option<&str>) -> Option<&str> {
    serial.filter(|s| !s.is_empty() && !s.contains('/'))
}

/// Lists serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialEnumerator;

impl SerialEnumerator {
    pub fn scan(&self) -> Vec<DeviceAddress> {
        match serialport::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .filter(platform::keep_port)
                .map(|port| DeviceAddress::serial(Some(port.port_name.as_str())))
                .collect(),
            Err(e) => {
                log::warn!("Serial port enumeration failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Enumerates both transports for the host platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnumerator {
    usb: UsbEnumerator,
    serial: SerialEnumerator,
}

impl DeviceEnumerator for SystemEnumerator {
    fn enumerate(&self, filter: Option<TransportKind>) -> Vec<DeviceAddress> {
        let mut found = Vec::new();
        if filter.is_none() || filter == Some(TransportKind::Usb) {
            found.extend(self.usb.scan());
        }
        if filter.is_none() || filter == Some(TransportKind::Serial) {
            found.extend(self.serial.scan());
        }
        log::debug!("Enumerated {} candidate(s)", found.len());
        found
    }
}

/// Enumerator for the platform this binary runs on.
pub fn default_enumerator() -> SystemEnumerator {
    log::debug!("Using {} device enumeration", platform::NAME);
    SystemEnumerator::default()
}

#[cfg(target_os = "macos")]
mod platform {
    use super::SerialPortInfo;

    pub const NAME: &str = "macOS";

    /// Only call-out nodes; opening the `tty.*` twin blocks until carrier detect.
    pub fn keep_port(port: &SerialPortInfo) -> bool {
        port.port_name.starts_with("/dev/cu.")
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::SerialPortInfo;

    pub const NAME: &str = if cfg!(windows) { "Windows" } else { "POSIX" };

    pub fn keep_port(_port: &SerialPortInfo) -> bool {
        true
    }
}
