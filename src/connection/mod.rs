//! Connection lifecycle for the sensor device.
//!
//! [`ConnectionManager`] owns the transport, the acquisition worker and the
//! shared buffer. Lifecycle calls (`connect`, `start_capture`,
//! `stop_capture`, `disconnect`) are serialized behind one async lock, so
//! concurrent callers never see a half-built session. [`status`] reads a
//! separate snapshot and never waits on that lock.
//!
//! [`status`]: ConnectionManager::status

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::acquisition::{AcquisitionLoop, LoopTimings, SharedTransport};
use crate::buffer::BoundedTelemetryBuffer;
use crate::config::AcquisitionConfig;
use crate::decoder::FrameDecoder;
use crate::matcher::{PortMatcher, VendorMatcher, select_port};
use crate::transport::{Connector, Transport};
use crate::transports::SerialConnector;
use crate::types::{
    AcquisitionCounters, AcquisitionStatus, ConnectionState, PortDescriptor, StartOutcome,
    TelemetryRecord,
};
use crate::{AcquisitionError, Result};


/// State guarded by the lifecycle lock
struct Session {
    transport: Option<SharedTransport>,
    acquisition: AcquisitionLoop,
}

/// Copy of the session state for status queries
#[derive(Debug, Clone, Default)]
struct Snapshot {
    state: ConnectionState,
    port: Option<String>,
}

/// Owns one device session: port selection, transport, worker and buffer.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    matcher: Box<dyn PortMatcher>,
    config: AcquisitionConfig,
    buffer: Arc<BoundedTelemetryBuffer>,
    counters: Arc<AcquisitionCounters>,
    decoder: Arc<FrameDecoder>,
    session: tokio::sync::Mutex<Session>,
    snapshot: Mutex<Snapshot>,
}

impl ConnectionManager {
    /// Create a manager over `connector`, matching ports with the configured vendor signatures.
    pub fn new(connector: impl Connector, config: AcquisitionConfig) -> Self {
        let buffer = Arc::new(BoundedTelemetryBuffer::new(config.buffer_capacity));
        let counters = Arc::new(AcquisitionCounters::new());
        let decoder = Arc::new(FrameDecoder::new());
        let acquisition = AcquisitionLoop::new(
            Arc::clone(&buffer),
            Arc::clone(&counters),
            Arc::clone(&decoder),
            LoopTimings::from(&config),
        );

        Self {
            connector: Arc::new(connector),
            matcher: Box::new(VendorMatcher::new(&config.vendor_signatures)),
            config,
            buffer,
            counters,
            decoder,
            session: tokio::sync::Mutex::new(Session { transport: None, acquisition }),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Manager over the host's serial ports
    pub fn serial(config: AcquisitionConfig) -> Self {
        Self::new(SerialConnector::new(), config)
    }

    /// Replace the auto-detection heuristic.
    pub fn with_matcher(mut self, matcher: impl PortMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// List serial ports visible to the host.
    pub fn enumerate_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = self.connector.available_ports()?;
        debug!("Enumerated {} port(s)", ports.len());
        Ok(ports)
    }

    /// Open `port`, or the single auto-detected port when `None`.
    ///
    /// An existing session is torn down first. On failure the manager is left
    /// disconnected with nothing held open. Returns the port identifier.
    pub async fn connect(&self, port: Option<&str>) -> Result<String> {
        let mut session = self.session.lock().await;

        if session.transport.is_some() {
            info!("Replacing existing connection");
            self.teardown(&mut session).await;
        }

        let port = match port {
            Some(port) => port.to_string(),
            None => {
                let selected = select_port(self.enumerate_ports()?, &*self.matcher)?;
                info!("Auto-detected device on {}", selected);
                selected.id
            }
        };

        info!("Opening {} at {} baud", port, self.config.line.baud_rate);
        let mut transport =
            self.connector.open(&port, &self.config.line).await.map_err(|e| match e {
                e @ AcquisitionError::Connect { .. } => e,
                other => {
                    AcquisitionError::connect_failed_with_source(&port, "open failed", Box::new(other))
                }
            })?;

        if let Err(e) = self.initialize(transport.as_mut()).await {
            if let Err(close_err) = transport.close().await {
                warn!("Closing {} after failed initialization: {}", port, close_err);
            }
            return Err(AcquisitionError::connect_failed_with_source(
                &port,
                "device initialization failed",
                Box::new(e),
            ));
        }

        session.transport = Some(Arc::new(tokio::sync::Mutex::new(transport)));
        self.set_snapshot(ConnectionState::Connected, Some(port.clone()));
        info!("Connected to {}", port);

        Ok(port)
    }

    /// Wait for the device to reset, drop stale input and log its greeting.
    async fn initialize(&self, transport: &mut dyn Transport) -> Result<()> {
        pause(self.config.settle_delay()).await;
        transport.discard_buffers().await?;

        pause(self.config.greeting_delay()).await;
        match transport.read_line_if_available().await? {
            Some(greeting) => info!("Device greeting: {}", greeting.trim()),
            None => debug!("No greeting from device"),
        }

        Ok(())
    }

    /// Start the acquisition worker. Requires a connection.
    pub async fn start_capture(&self) -> Result<StartOutcome> {
        let mut session = self.session.lock().await;
        let Some(transport) = session.transport.clone() else {
            return Err(AcquisitionError::NotConnected);
        };

        let outcome = session.acquisition.start(transport);
        if outcome == StartOutcome::Started {
            self.set_state(ConnectionState::Capturing);
            info!("Capture started");
        }

        Ok(outcome)
    }

    /// Stop the worker but keep the connection and buffered records.
    pub async fn stop_capture(&self) {
        let mut session = self.session.lock().await;
        if !session.acquisition.is_running() {
            return;
        }

        session.acquisition.stop().await;
        if session.transport.is_some() {
            self.set_state(ConnectionState::Connected);
        }
        info!("Capture stopped");
    }

    /// Stop capture, close the transport and empty the buffer. Never fails.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        self.teardown(&mut session).await;
    }

    async fn teardown(&self, session: &mut Session) {
        session.acquisition.stop().await;

        if let Some(transport) = session.transport.take() {
            if let Err(e) = transport.lock().await.close().await {
                error!("Error closing transport: {}", e);
            }
        }

        let cleared = self.buffer.clear();
        let port = self.snapshot().port;
        self.set_snapshot(ConnectionState::Disconnected, None);

        match port {
            Some(port) => info!("Disconnected from {} ({} buffered record(s) discarded)", port, cleared),
            None => debug!("Disconnect with no open session"),
        }
    }

    /// Current state plus counters. Never blocks on lifecycle calls.
    pub fn status(&self) -> AcquisitionStatus {
        let Snapshot { state, port } = self.snapshot();
        AcquisitionStatus {
            state,
            port,
            stats: self.counters.snapshot(self.decoder.ignored(), self.buffer.dropped(), self.buffer.len()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_capturing(&self) -> bool {
        self.state().is_capturing()
    }

    /// Write raw bytes to the device.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let transport = self.session.lock().await.transport.clone().ok_or(AcquisitionError::NotConnected)?;
        let mut transport = transport.lock().await;
        transport.write_all(bytes).await
    }

    /// Shared record buffer, for consumers that hold it directly.
    pub fn buffer(&self) -> &Arc<BoundedTelemetryBuffer> {
        &self.buffer
    }

    /// Wait up to `timeout` for the oldest buffered record.
    pub async fn pop(&self, timeout: Duration) -> Option<TelemetryRecord> {
        self.buffer.pop(timeout).await
    }

    /// Collect up to `count` records within `timeout` overall.
    pub async fn pop_batch(&self, count: usize, timeout: Duration) -> Vec<TelemetryRecord> {
        self.buffer.pop_batch(count, timeout).await
    }

    /// Drop buffered records, returning how many were discarded.
    pub fn clear_buffer(&self) -> usize {
        self.buffer.clear()
    }

    /// Zero counters, the ignored-line count and the overflow count.
    pub fn reset_stats(&self) {
        self.counters.reset();
        self.decoder.reset();
        self.buffer.reset_dropped();
    }

    /// Worker tasks currently alive (0 or 1)
    pub async fn active_workers(&self) -> usize {
        self.session.lock().await.acquisition.active_workers()
    }

    fn snapshot(&self) -> Snapshot {
        self.lock_snapshot().clone()
    }

    fn set_state(&self, state: ConnectionState) {
        self.lock_snapshot().state = state;
    }

    fn set_snapshot(&self, state: ConnectionState, port: Option<String>) {
        *self.lock_snapshot() = Snapshot { state, port };
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
