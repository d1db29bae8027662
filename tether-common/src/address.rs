// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device addresses: parsing, canonical formatting and matching.
//!
//! Grammar:
//!
//! ```text
//! address      := transport? selector
//! transport    := "usb@" | "serial@"
//! usb_selector := "/" hex_or_empty "/" hex_or_empty "/" hex_or_empty "/" text_or_empty
//! path_selector:= text_or_empty
//! ```
//!
//! An empty segment is a wildcard. A parsed address is used either as a
//! *specification* (may contain wildcards) or as an enumerated *candidate*
//! (always full); [`DeviceAddress::matches`] compares the two.

use std::fmt;
use std::str::FromStr;

use crate::error::{AddressError, InvalidReason};

pub const USB_PREFIX: &str = "usb@";
pub const SERIAL_PREFIX: &str = "serial@";

/// Number of `/`-separated segments in a USB selector.
pub const USB_SEGMENTS: usize = 4;

const VENDOR_DIGITS: usize = 4;
const PRODUCT_DIGITS: usize = 4;
const INTERFACE_DIGITS: usize = 2;

/// Physical channel a device is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Usb,
    Serial,
}

impl TransportKind {
    pub fn prefix(self) -> &'static str {
        match self {
            TransportKind::Usb => USB_PREFIX,
            TransportKind::Serial => SERIAL_PREFIX,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Usb => f.write_str("usb"),
            TransportKind::Serial => f.write_str("serial"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usb" => Ok(TransportKind::Usb),
            "serial" => Ok(TransportKind::Serial),
            other => Err(format!("unknown transport `{other}` (expected usb or serial)")),
        }
    }
}

/// USB selector fields; `None` is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UsbSelector {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub interface: Option<u8>,
    pub serial_number: Option<String>,
}

impl UsbSelector {
    fn is_full(&self) -> bool {
        self.vendor_id.is_some()
            && self.product_id.is_some()
            && self.interface.is_some()
            && self.serial_number.is_some()
    }

    fn matches(&self, candidate: &UsbSelector) -> bool {
        field_matches(&self.vendor_id, &candidate.vendor_id)
            && field_matches(&self.product_id, &candidate.product_id)
            && field_matches(&self.interface, &candidate.interface)
            && field_matches(&self.serial_number, &candidate.serial_number)
    }
}

/// A structured, possibly wildcarded device locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DeviceAddress {
    /// No transport and no selectors: matches every device.
    #[default]
    Any,
    Usb(UsbSelector),
    Serial { path: Option<String> },
    /// Unprefixed host path. Never matches an enumerated device.
    Host(String),
}

impl DeviceAddress {
    /// Build a USB address. An empty serial number is treated as a wildcard.
    pub fn usb(
        vendor_id: Option<u16>,
        product_id: Option<u16>,
        interface: Option<u8>,
        serial_number: Option<&str>,
    ) -> Self {
        DeviceAddress::Usb(UsbSelector {
            vendor_id,
            product_id,
            interface,
            serial_number: non_empty(serial_number),
        })
    }

    /// Build a serial address. An empty path is treated as a wildcard.
    pub fn serial(path: Option<&str>) -> Self {
        DeviceAddress::Serial {
            path: non_empty(path),
        }
    }

    /// Parse `text` into an address.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if text.is_empty() {
            return Ok(DeviceAddress::Any);
        }
        if let Some(rest) = text.strip_prefix(USB_PREFIX) {
            return parse_usb(text, rest);
        }
        if let Some(rest) = text.strip_prefix(SERIAL_PREFIX) {
            return Ok(DeviceAddress::serial(Some(rest)));
        }
        Ok(DeviceAddress::Host(text.to_string()))
    }

    /// Canonical text form. `parse(format())` reproduces `self`.
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Transport this address is restricted to, if any.
    pub fn transport(&self) -> Option<TransportKind> {
        match self {
            DeviceAddress::Usb(_) => Some(TransportKind::Usb),
            DeviceAddress::Serial { .. } => Some(TransportKind::Serial),
            DeviceAddress::Any | DeviceAddress::Host(_) => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, DeviceAddress::Any)
    }

    /// True iff every selector that applies to this transport is concrete.
    pub fn is_full(&self) -> bool {
        match self {
            DeviceAddress::Any => false,
            DeviceAddress::Usb(selector) => selector.is_full(),
            DeviceAddress::Serial { path } => path.is_some(),
            DeviceAddress::Host(_) => true,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.is_full()
    }

    /// USB serial number, when this is a USB address that carries one.
    pub fn usb_serial_number(&self) -> Option<&str> {
        match self {
            DeviceAddress::Usb(selector) => selector.serial_number.as_deref(),
            _ => None,
        }
    }

    /// Whether this specification selects `candidate`.
    ///
    /// Every concrete field of `self` must equal the candidate's field;
    /// wildcards impose no constraint. Candidates must be full.
    pub fn matches(&self, candidate: &DeviceAddress) -> bool {
        if !candidate.is_full() || matches!(candidate, DeviceAddress::Host(_)) {
            return false;
        }

        match (self, candidate) {
            (DeviceAddress::Any, _) => true,
            (DeviceAddress::Usb(spec), DeviceAddress::Usb(found)) => spec.matches(found),
            (DeviceAddress::Serial { path: spec }, DeviceAddress::Serial { path: found }) => {
                field_matches(spec, found)
            }
            _ => false,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Any => Ok(()),
            DeviceAddress::Usb(selector) => {
                f.write_str(USB_PREFIX)?;
                write_hex(f, selector.vendor_id.map(u32::from), VENDOR_DIGITS)?;
                write_hex(f, selector.product_id.map(u32::from), PRODUCT_DIGITS)?;
                write_hex(f, selector.interface.map(u32::from), INTERFACE_DIGITS)?;
                write!(f, "/{}", selector.serial_number.as_deref().unwrap_or(""))
            }
            DeviceAddress::Serial { path } => {
                write!(f, "{SERIAL_PREFIX}{}", path.as_deref().unwrap_or(""))
            }
            DeviceAddress::Host(path) => f.write_str(path),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceAddress::parse(s)
    }
}

fn parse_usb(text: &str, rest: &str) -> Result<DeviceAddress, AddressError> {
    if rest.is_empty() {
        return Ok(DeviceAddress::Usb(UsbSelector::default()));
    }
    let body = rest
        .strip_prefix('/')
        .ok_or_else(|| AddressError::new(text, InvalidReason::MissingSeparator))?;

    let segments: Vec<&str> = body.split('/').collect();
    if segments.len() > USB_SEGMENTS {
        return Err(AddressError::new(
            text,
            InvalidReason::TooManySegments { max: USB_SEGMENTS },
        ));
    }
    let segment = |index: usize| segments.get(index).copied().filter(|s| !s.is_empty());

    let vendor_id = segment(0)
        .map(|s| parse_hex(text, s, "vendor id", VENDOR_DIGITS))
        .transpose()?;
    let product_id = segment(1)
        .map(|s| parse_hex(text, s, "product id", PRODUCT_DIGITS))
        .transpose()?;
    let interface = segment(2)
        .map(|s| parse_hex(text, s, "interface number", INTERFACE_DIGITS))
        .transpose()?;

    // Widths are bounded by parse_hex, so the narrowing casts are lossless.
    Ok(DeviceAddress::usb(
        vendor_id.map(|v| v as u16),
        product_id.map(|v| v as u16),
        interface.map(|v| v as u8),
        segment(3),
    ))
}

fn parse_hex(
    text: &str,
    segment: &str,
    field: &'static str,
    digits: usize,
) -> Result<u32, AddressError> {
    if !segment.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::new(text, InvalidReason::NotHex { field }));
    }
    if segment.len() > digits {
        return Err(AddressError::new(
            text,
            InvalidReason::TooWide { field, digits },
        ));
    }
    u32::from_str_radix(segment, 16)
        .map_err(|_| AddressError::new(text, InvalidReason::NotHex { field }))
}

fn write_hex(f: &mut fmt::Formatter<'_>, value: Option<u32>, digits: usize) -> fmt::Result {
    match value {
        Some(value) => write!(f, "/{value:0digits$X}"),
        None => f.write_str("/"),
    }
}

fn field_matches<T: PartialEq>(spec: &Option<T>, candidate: &Option<T>) -> bool {
    spec.as_ref().map_or(true, |want| candidate.as_ref() == Some(want))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}
