//! Scripted in-memory transport.
//!
//! Lets tests and demos drive the acquisition loop without hardware:
//! lines and read faults are queued through a [`MockHandle`] and served one
//! per poll.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::LineSettings;
use crate::transport::{Connector, Transport};
use crate::types::PortDescriptor;
use crate::{AcquisitionError, Result};

#[derive(Debug)]
enum Scripted {
    Line(String),
    Fault(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    reads: VecDeque<Scripted>,
    after_reset: Vec<String>,
    written: Vec<u8>,
    open: bool,
    stalled: bool,
    discards: usize,
    closes: usize,
    polls: u64,
}

/// Test-side handle onto a [`MockTransport`]
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a line for the reader
    pub fn push_line(&self, line: impl Into<String>) {
        self.lock().reads.push_back(Scripted::Line(line.into()));
    }

    pub fn push_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.lock();
        state.reads.extend(lines.into_iter().map(|line| Scripted::Line(line.into())));
    }

    /// Queue a transient read fault
    pub fn push_fault(&self, kind: io::ErrorKind) {
        self.lock().reads.push_back(Scripted::Fault(kind));
    }

    /// Lines the device prints right after its buffers are reset (boot banner)
    pub fn set_after_reset<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().after_reset = lines.into_iter().map(Into::into).collect();
    }

    /// Make every subsequent read hang until the reader is cancelled
    pub fn stall(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Bytes written to the device so far
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn pending_reads(&self) -> usize {
        self.lock().reads.len()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn discard_count(&self) -> usize {
        self.lock().discards
    }

    /// Number of read polls served
    pub fn polls(&self) -> u64 {
        self.lock().polls
    }
}

/// In-memory [`Transport`] driven by a [`MockHandle`]
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    /// Create an open transport and the handle that scripts it
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        handle.lock().open = true;
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn read_line_if_available(&mut self) -> Result<Option<String>> {
        let next = {
            let mut state = self.handle.lock();
            if !state.open {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "mock closed").into());
            }
            state.polls += 1;
            if state.stalled { None } else { Some(state.reads.pop_front()) }
        };

        match next {
            None => {
                futures::future::pending::<()>().await;
                Ok(None)
            }
            Some(None) => Ok(None),
            Some(Some(Scripted::Line(line))) => Ok(Some(line)),
            Some(Some(Scripted::Fault(kind))) => Err(io::Error::new(kind, "scripted fault").into()),
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.handle.lock();
        if !state.open {
            let source = io::Error::new(io::ErrorKind::NotConnected, "mock closed");
            return Err(AcquisitionError::TransportWrite { source });
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn discard_buffers(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        state.discards += 1;
        state.reads.clear();
        let banner: Vec<String> = state.after_reset.drain(..).collect();
        state.reads.extend(banner.into_iter().map(Scripted::Line));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        state.open = false;
        state.closes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}

/// [`Connector`] that hands out [`MockTransport`]s for a fixed port list
#[derive(Debug, Default)]
pub struct MockConnector {
    ports: Mutex<Vec<PortDescriptor>>,
    opened: Mutex<Vec<(String, MockHandle)>>,
    banner: Mutex<Vec<String>>,
    fail_enumeration: AtomicBool,
    refuse_open: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports<I>(ports: I) -> Self
    where
        I: IntoIterator<Item = PortDescriptor>,
    {
        let connector = Self::new();
        connector.set_ports(ports);
        connector
    }

    pub fn set_ports<I>(&self, ports: I)
    where
        I: IntoIterator<Item = PortDescriptor>,
    {
        *self.ports.lock().unwrap_or_else(PoisonError::into_inner) = ports.into_iter().collect();
    }

    /// Boot banner every newly opened transport prints after its buffers are reset
    pub fn set_banner<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.banner.lock().unwrap_or_else(PoisonError::into_inner) =
            lines.into_iter().map(Into::into).collect();
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    pub fn refuse_open(&self, refuse: bool) {
        self.refuse_open.store(refuse, Ordering::SeqCst);
    }

    /// Handle of the most recently opened transport
    pub fn last_opened(&self) -> Option<(String, MockHandle)> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(AcquisitionError::enumeration_failed("scripted enumeration failure"));
        }
        Ok(self.ports.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn open(&self, port: &str, _settings: &LineSettings) -> Result<Box<dyn Transport>> {
        if self.refuse_open.load(Ordering::SeqCst) {
            return Err(AcquisitionError::connect_failed(port, "scripted open failure"));
        }

        let (transport, handle) = MockTransport::new();
        handle.set_after_reset(self.banner.lock().unwrap_or_else(PoisonError::into_inner).clone());
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((port.to_string(), handle));

        Ok(Box::new(transport))
    }
}
