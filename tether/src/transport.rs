// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial and USB links to tether devices.
//!
//! Both links carry the same postcard/COBS frames; [`HostDriver`] picks one
//! from the address transport.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use nusb::transfer::{Direction, EndpointType, Queue, RequestBuffer};
use serialport::SerialPort;

use tether_common::protocol::{Command, Response, MAX_FRAME_SIZE};
use tether_common::{DeviceAddress, DeviceDriver, DeviceLink, TransportError, UsbSelector};

/// Default timeout for link operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Baud rate for serial links (ignored by USB CDC devices).
pub const SERIAL_BAUD: u32 = 115_200;

/// Interval between polls of a pending USB transfer.
const USB_POLL_INTERVAL: Duration = Duration::from_millis(2);

// Waits for the next completion on a nusb queue, cancelling the transfer
// once `$timeout` has elapsed.
macro_rules! await_completion {
    ($queue:expr, $timeout:expr) => {{
        let deadline = Instant::now() + $timeout;
        loop {
            let poll = futures_lite::future::poll_once($queue.next_complete());
            if let Some(completion) = futures_lite::future::block_on(poll) {
                break Ok(completion);
            }
            if Instant::now() >= deadline {
                $queue.cancel_all();
                break Err(TransportError::Timeout);
            }
            std::thread::sleep(USB_POLL_INTERVAL);
        }
    }};
}

/// Encode `cmd` as one COBS frame, delimiter included.
pub fn encode_frame(cmd: &Command) -> Result<Vec<u8>, TransportError> {
    postcard::to_stdvec_cobs(cmd)
        .map_err(|e| TransportError::Frame(format!("failed to serialize command: {e}")))
}

/// Decode one COBS frame (delimiter included) into a response.
pub fn decode_frame(frame: &mut [u8]) -> Result<Response, TransportError> {
    let len = frame.len();
    postcard::from_bytes_cobs(frame).map_err(|e| {
        TransportError::Frame(format!(
            "failed to deserialize response: {} (raw {} bytes: {:02x?})",
            e,
            len,
            &frame[..len.min(32)]
        ))
    })
}

/// Accumulates bytes until a frame delimiter is seen.
#[derive(Default)]
struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append `bytes`; returns the length of a complete frame, if one ended.
    fn push(&mut self, bytes: &[u8]) -> Result<Option<usize>, TransportError> {
        for &byte in bytes {
            self.buf.push(byte);
            if byte == 0 {
                return Ok(Some(self.buf.len()));
            }
            if self.buf.len() > MAX_FRAME_SIZE {
                return Err(TransportError::Frame(format!(
                    "frame exceeds {MAX_FRAME_SIZE} bytes"
                )));
            }
        }
        Ok(None)
    }

    fn decode(&mut self, len: usize) -> Result<Response, TransportError> {
        decode_frame(&mut self.buf[..len])
    }
}

// =============================================================================
// Serial
// =============================================================================

/// A device reached through a serial port (including USB CDC ACM).
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    rx: FrameBuffer,
}

impl SerialLink {
    /// Open the serial port at `path`.
    pub fn open(path: &str, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, SERIAL_BAUD)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::OpenFailed {
                address: path.to_string(),
                message: e.to_string(),
            })?;
        log::debug!("Opened serial port {}", path);

        Ok(Self {
            port,
            rx: FrameBuffer::default(),
        })
    }

    fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    fn send(&mut self, cmd: &Command) -> Result<(), TransportError> {
        let frame = encode_frame(cmd)?;
        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Response, TransportError> {
        self.rx.clear();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    if let Some(len) = self.rx.push(&byte)? {
                        return self.rx.decode(len);
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(TransportError::Timeout);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl DeviceLink for SerialLink {
    fn request(&mut self, command: &Command) -> Result<Response, TransportError> {
        self.drain_rx();
        self.send(command)?;
        self.receive()
    }
}

// =============================================================================
// USB
// =============================================================================

/// A device reached through a vendor-specific USB bulk interface.
pub struct UsbLink {
    interface: nusb::Interface,
    in_ep: u8,
    out_ep: u8,
    max_packet_size: usize,
    timeout: Duration,
    rx: FrameBuffer,
}

impl UsbLink {
    /// Find the device selected by `selector` and claim its interface.
    pub fn open(selector: &UsbSelector, timeout: Duration) -> Result<Self, TransportError> {
        let address = DeviceAddress::Usb(selector.clone()).format();
        let open_failed = |message: String| TransportError::OpenFailed {
            address: address.clone(),
            message,
        };
        let interface_number = selector
            .interface
            .ok_or_else(|| open_failed("no interface number".to_string()))?;

        let device_info = nusb::list_devices()
            .map_err(|e| open_failed(e.to_string()))?
            .find(|d| {
                selector.vendor_id == Some(d.vendor_id())
                    && selector.product_id == Some(d.product_id())
                    && selector.serial_number.as_deref() == d.serial_number()
            })
            .ok_or_else(|| open_failed("device not present".to_string()))?;

        let device = device_info
            .open()
            .map_err(|e| open_failed(e.to_string()))?;

        // Endpoint addresses come from the active configuration
        let mut in_ep = None;
        let mut out_ep = None;
        let mut max_packet_size = 64;
        if let Ok(config) = device.active_configuration() {
            for alt in config.interface_alt_settings() {
                if alt.interface_number() != interface_number {
                    continue;
                }
                for ep in alt.endpoints() {
                    if ep.transfer_type() != EndpointType::Bulk {
                        continue;
                    }
                    match ep.direction() {
                        Direction::In if in_ep.is_none() => {
                            in_ep = Some(ep.address());
                            max_packet_size = ep.max_packet_size();
                        }
                        Direction::Out if out_ep.is_none() => out_ep = Some(ep.address()),
                        _ => {}
                    }
                }
                break;
            }
        }
        let (Some(in_ep), Some(out_ep)) = (in_ep, out_ep) else {
            return Err(open_failed(format!(
                "interface {interface_number} has no bulk endpoint pair"
            )));
        };

        let interface = device
            .claim_interface(interface_number)
            .map_err(|e| open_failed(format!("failed to claim interface: {e}")))?;
        log::debug!(
            "Claimed {} (interface {}, IN 0x{:02x}, OUT 0x{:02x})",
            address,
            interface_number,
            in_ep,
            out_ep
        );

        Ok(Self {
            interface,
            in_ep,
            out_ep,
            max_packet_size,
            timeout,
            rx: FrameBuffer::default(),
        })
    }

    fn write_packet(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        let mut queue: Queue<Vec<u8>> = self.interface.bulk_out_queue(self.out_ep);
        queue.submit(data);

        let completion = await_completion!(queue, self.timeout)?;
        completion
            .status
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Response, TransportError> {
        self.rx.clear();
        let deadline = Instant::now() + self.timeout;
        let mut queue: Queue<RequestBuffer> = self.interface.bulk_in_queue(self.in_ep);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }
            queue.submit(RequestBuffer::new(self.max_packet_size));

            let completion = await_completion!(queue, remaining)?;
            completion
                .status
                .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
            log::trace!("USB read {} bytes", completion.data.len());

            if let Some(len) = self.rx.push(&completion.data)? {
                return self.rx.decode(len);
            }
        }
    }
}

impl DeviceLink for UsbLink {
    fn request(&mut self, command: &Command) -> Result<Response, TransportError> {
        let frame = encode_frame(command)?;
        self.write_packet(frame)?;
        self.receive()
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Opens serial or USB links depending on the address transport.
#[derive(Debug, Clone, Copy)]
pub struct HostDriver {
    timeout: Duration,
}

impl HostDriver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HostDriver {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl DeviceDriver for HostDriver {
    fn open_link(&self, address: &DeviceAddress) -> Result<Box<dyn DeviceLink>, TransportError> {
        if !address.is_full() {
            return Err(TransportError::OpenFailed {
                address: address.format(),
                message: "address does not name a single device".to_string(),
            });
        }

        match address {
            DeviceAddress::Serial { path: Some(path) } => {
                Ok(Box::new(SerialLink::open(path, self.timeout)?))
            }
            DeviceAddress::Usb(selector) => Ok(Box::new(UsbLink::open(selector, self.timeout)?)),
            other => Err(TransportError::OpenFailed {
                address: other.format(),
                message: "not a device address".to_string(),
            }),
        }
    }
}
