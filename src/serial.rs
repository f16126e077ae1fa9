// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::io;
use std::time::Duration;
use log::{debug, info, warn};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use thiserror::Error;
use crate::frame::Frame;

// ============================================================================
// Line Settings
// ============================================================================

/// Baud rates accepted by [`SerialConfig::validate`]
pub const STANDARD_BAUD_RATES: [u32; 15] = [
    110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200,
    38400, 57600, 115200, 230400, 460800, 921600,
];

/// Framing is fixed at 8N1
pub const DATA_BITS: DataBits = DataBits::Eight;
pub const PARITY: Parity = Parity::None;
pub const STOP_BITS: StopBits = StopBits::One;

/// serialport needs a timeout; long enough that writes block like a plain OS write
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    #[error("invalid parameter for serial port {port}: {reason}")]
    InvalidParameter { port: String, reason: String },

    #[error("write to serial port {port} failed: {reason}")]
    WriteFailed { port: String, reason: String },
}

impl TransportError {
    fn from_serialport(port: &str, err: serialport::Error) -> Self {
        let port = port.to_string();
        let reason = err.to_string();
        match err.kind() {
            serialport::ErrorKind::InvalidInput => TransportError::InvalidParameter { port, reason },
            _ => TransportError::PortUnavailable { port, reason },
        }
    }

    /// Name of the port the error relates to
    pub fn port(&self) -> &str {
        match self {
            TransportError::PortUnavailable { port, .. }
            | TransportError::InvalidParameter { port, .. }
            | TransportError::WriteFailed { port, .. } => port,
        }
    }
}

// ============================================================================
// Serial Config
// ============================================================================

/// Port name and baud rate for a single send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        SerialConfig { port_name: port_name.into(), baud_rate }
    }

    /// Check well-formedness without touching the OS
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.port_name.trim().is_empty() {
            return Err(TransportError::InvalidParameter {
                port: self.port_name.clone(),
                reason: "port name is empty".to_string(),
            });
        }
        if !STANDARD_BAUD_RATES.contains(&self.baud_rate) {
            return Err(TransportError::InvalidParameter {
                port: self.port_name.clone(),
                reason: format!("unsupported baud rate {}", self.baud_rate),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Trait for the serial port operations needed to push a frame out
pub trait SerialPort: Send {
    /// Single write call, returns how many bytes the OS accepted
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Something that can hand out open serial ports
pub trait PortOpener {
    fn open_port(&self, config: &SerialConfig) -> Result<Box<dyn SerialPort>, serialport::Error>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn serialport::SerialPort>,
}

impl RealSerialPort {
    pub fn open(config: &SerialConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(DATA_BITS)
            .parity(PARITY)
            .stop_bits(STOP_BITS)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?;

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut *self.port, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut *self.port)
    }
}

/// Opens ports on the host through the serialport crate
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn open_port(&self, config: &SerialConfig) -> Result<Box<dyn SerialPort>, serialport::Error> {
        Ok(Box::new(RealSerialPort::open(config)?))
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .map_err(|e| TransportError::from_serialport("*", e))
}

// ============================================================================
// Connection
// ============================================================================

/// Exclusive hold on one open port. Released on close or drop, whichever comes first.
pub struct Connection {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl Connection {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        Self::open_with(&SystemPorts, config)
    }

    pub fn open_with<O: PortOpener + ?Sized>(opener: &O, config: &SerialConfig) -> Result<Self, TransportError> {
        config.validate()?;

        let port = opener
            .open_port(config)
            .map_err(|e| TransportError::from_serialport(&config.port_name, e))?;
        info!("Opened serial port {} at {} baud", config.port_name, config.baud_rate);

        Ok(Connection {
            port_name: config.port_name.clone(),
            port: Some(port),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Write the frame's bytes as-is. A short write is an error.
    pub fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let name = &self.port_name;
        let Some(port) = self.port.as_mut() else {
            return Err(write_failed(name, "port already closed".to_string()));
        };

        let bytes = frame.as_bytes();
        let written = port.write(bytes).map_err(|e| write_failed(name, e.to_string()))?;
        if written != bytes.len() {
            return Err(write_failed(name, format!("short write: {} of {} bytes", written, bytes.len())));
        }
        port.flush().map_err(|e| write_failed(name, e.to_string()))?;

        debug!("Sent {} bytes to {}", written, name);
        Ok(())
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.port_name);
        }
    }
}

fn write_failed(port: &str, reason: String) -> TransportError {
    warn!("Write to {} failed: {}", port, reason);
    TransportError::WriteFailed {
        port: port.to_string(),
        reason,
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
use std::cell::{Cell, RefCell};
#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
pub struct MockSerialPort {
    name: String,
    // Ports currently open, shared with the MockPorts that opened us
    held: Arc<Mutex<HashSet<String>>>,
    // Cap on bytes accepted per write (None = accept everything)
    accept_limit: Option<usize>,
    fail_write: Option<io::ErrorKind>,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.fail_write {
            return Err(io::Error::new(kind, "Mock write failure"));
        }
        let n = self.accept_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.write_log.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.held.lock().unwrap().remove(&self.name);

        if std::thread::panicking() {
            return;
        }
        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:?}\nGot {} bytes:\n{:?}",
            self.expected_writes.len(),
            String::from_utf8_lossy(&self.expected_writes),
            self.write_log.len(),
            String::from_utf8_lossy(&self.write_log)
        );
    }
}

/// Fake set of ports. Only names in `present` exist and each can be held once.
#[cfg(test)]
pub struct MockPorts {
    present: Vec<String>,
    held: Arc<Mutex<HashSet<String>>>,
    opens: Cell<usize>,
    expected_writes: RefCell<Vec<u8>>,
    accept_limit: Option<usize>,
    fail_write: Option<io::ErrorKind>,
}

#[cfg(test)]
impl MockPorts {
    pub fn new(present: &[&str]) -> Self {
        MockPorts {
            present: present.iter().map(|s| s.to_string()).collect(),
            held: Arc::new(Mutex::new(HashSet::new())),
            opens: Cell::new(0),
            expected_writes: RefCell::new(Vec::new()),
            accept_limit: None,
            fail_write: None,
        }
    }

    pub fn expect_writes(self, bytes: &[u8]) -> Self {
        *self.expected_writes.borrow_mut() = bytes.to_vec();
        self
    }

    pub fn accept_at_most(mut self, limit: usize) -> Self {
        self.accept_limit = Some(limit);
        self
    }

    pub fn fail_writes(mut self, kind: io::ErrorKind) -> Self {
        self.fail_write = Some(kind);
        self
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().unwrap().contains(name)
    }

    pub fn open_count(&self) -> usize {
        self.opens.get()
    }
}

#[cfg(test)]
impl PortOpener for MockPorts {
    fn open_port(&self, config: &SerialConfig) -> Result<Box<dyn SerialPort>, serialport::Error> {
        self.opens.set(self.opens.get() + 1);

        if !self.present.contains(&config.port_name) {
            return Err(serialport::Error::new(serialport::ErrorKind::NoDevice, "No such device"));
        }
        if !self.held.lock().unwrap().insert(config.port_name.clone()) {
            return Err(serialport::Error::new(
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
                "Device or resource busy",
            ));
        }

        Ok(Box::new(MockSerialPort {
            name: config.port_name.clone(),
            held: Arc::clone(&self.held),
            accept_limit: self.accept_limit,
            fail_write: self.fail_write,
            write_log: Vec::new(),
            expected_writes: self.expected_writes.borrow().clone(),
        }))
    }
}
