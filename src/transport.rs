//! Transport traits for the device byte channel

use std::sync::Arc;

use crate::config::LineSettings;
use crate::types::PortDescriptor;
use crate::Result;

/// An open, line-oriented byte channel to the device.
///
/// Implementations must never block waiting for data in
/// [`read_line_if_available`](Transport::read_line_if_available): the
/// acquisition loop polls it and sleeps briefly itself when nothing is ready.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Return the next complete line if one is waiting
    ///
    /// Returns:
    /// - `Ok(Some(line))` - a complete line, without its terminator
    /// - `Ok(None)` - no complete line buffered yet
    /// - `Err(e)` - transient read fault
    async fn read_line_if_available(&mut self) -> Result<Option<String>>;

    /// Write raw bytes to the device
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Discard stale bytes in both directions
    async fn discard_buffers(&mut self) -> Result<()>;

    /// Close the channel. Idempotent and safe after a prior error.
    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Enumerates ports and opens transports on them.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// List the ports currently present. Never cached.
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `port` with the given line settings
    async fn open(&self, port: &str, settings: &LineSettings) -> Result<Box<dyn Transport>>;
}

#[async_trait::async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        (**self).available_ports()
    }

    async fn open(&self, port: &str, settings: &LineSettings) -> Result<Box<dyn Transport>> {
        (**self).open(port, settings).await
    }
}

/// Splits a byte stream into lines.
///
/// Bytes are decoded lossily as UTF-8; both `\n` and `\r\n` terminate a line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    /// Upper bound on a partial line; a longer run without a terminator is discarded
    pub const MAX_LINE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > Self::MAX_LINE && !self.pending.contains(&b'\n') {
            self.pending.clear();
        }
    }

    /// Pop the next complete line, if any
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
