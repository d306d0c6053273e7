//! Serial port transport backed by the `serialport` crate

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortType, StopBits};
use std::io::{self, Read, Write};
use tracing::{debug, info};

use crate::config::LineSettings;
use crate::transport::{Connector, LineAssembler, Transport};
use crate::types::PortDescriptor;
use crate::{AcquisitionError, Result};

const READ_CHUNK: usize = 4096;

/// Opens real serial ports with 8N1 framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl SerialConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Human-readable description for an enumerated port
fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match (&usb.product, &usb.manufacturer) {
            (Some(product), Some(manufacturer)) => format!("{product} ({manufacturer})"),
            (Some(product), None) => product.clone(),
            (None, Some(manufacturer)) => format!("{manufacturer} USB Serial Device"),
            (None, None) => format!("USB Serial Device {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "PCI Serial Port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth Serial Port".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

#[async_trait::async_trait]
impl Connector for SerialConnector {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports().map_err(|e| {
            AcquisitionError::enumeration_failed_with_source("serial port query failed", Box::new(e))
        })?;

        Ok(ports
            .into_iter()
            .map(|info| PortDescriptor::new(info.port_name, describe(&info.port_type)))
            .collect())
    }

    async fn open(&self, port: &str, settings: &LineSettings) -> Result<Box<dyn Transport>> {
        info!(port, baud = settings.baud_rate, "Opening serial port");

        let handle = serialport::new(port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| AcquisitionError::connect_failed_with_source(port, "open failed", Box::new(e)))?;

        Ok(Box::new(SerialTransport::new(handle)))
    }
}

/// Line transport over an open serial port
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    lines: LineAssembler,
    scratch: Vec<u8>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port: Some(port), lines: LineAssembler::new(), scratch: vec![0u8; READ_CHUNK] }
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(closed)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "port closed")
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn read_line_if_available(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        let port = self.port.as_mut().ok_or_else(closed)?;
        let waiting = port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(None);
        }

        let want = waiting.min(self.scratch.len());
        let read = match port.read(&mut self.scratch[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        self.lines.extend(&self.scratch[..read]);

        Ok(self.lines.next_line())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_mut().map_err(|source| AcquisitionError::TransportWrite { source })?;
        port.write_all(bytes)
            .and_then(|_| port.flush())
            .map_err(|source| AcquisitionError::TransportWrite { source })
    }

    async fn discard_buffers(&mut self) -> Result<()> {
        self.lines.clear();
        let port = self.port_mut()?;
        port.clear(ClearBuffer::All).map_err(io::Error::from)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(port) = self.port.take() {
            debug!(port = ?port.name(), "Closing serial port");
        }
        self.lines.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}
