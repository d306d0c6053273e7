//! Background acquisition worker.
//!
//! One task owns the read side of the transport while running: it polls
//! for complete lines, decodes them and pushes records into the shared
//! buffer. Faults are counted and backed off from; only a cancellation ends
//! the task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::BoundedTelemetryBuffer;
use crate::config::AcquisitionConfig;
use crate::decoder::{DecodeOutcome, FrameDecoder};
use crate::transport::Transport;
use crate::types::{AcquisitionCounters, LoopState, StartOutcome};

/// Transport shared between the worker and the connection manager
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Poll and backoff timings for the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimings {
    /// Sleep when no line is waiting
    pub idle_delay: Duration,
    /// Sleep after a transport read fault
    pub fault_backoff: Duration,
    /// Bound on joining the worker in [`AcquisitionLoop::stop`]
    pub stop_timeout: Duration,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self::from(&AcquisitionConfig::default())
    }
}

impl From<&AcquisitionConfig> for LoopTimings {
    fn from(config: &AcquisitionConfig) -> Self {
        Self {
            idle_delay: config.idle_delay(),
            fault_backoff: config.fault_backoff(),
            stop_timeout: config.stop_timeout(),
        }
    }
}

/// Decrements the live worker count when the task ends, however it ends
struct WorkerGuard(Arc<AtomicUsize>);

impl WorkerGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Starts, runs and stops the acquisition worker.
///
/// `start` and `stop` take `&mut self`; callers sharing a loop serialize them
/// behind their own lock (the connection manager does).
pub struct AcquisitionLoop {
    state: LoopState,
    buffer: Arc<BoundedTelemetryBuffer>,
    counters: Arc<AcquisitionCounters>,
    decoder: Arc<FrameDecoder>,
    timings: LoopTimings,
    active: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl AcquisitionLoop {
    pub fn new(
        buffer: Arc<BoundedTelemetryBuffer>,
        counters: Arc<AcquisitionCounters>,
        decoder: Arc<FrameDecoder>,
        timings: LoopTimings,
    ) -> Self {
        Self {
            state: LoopState::Idle,
            buffer,
            counters,
            decoder,
            timings,
            active: Arc::new(AtomicUsize::new(0)),
            task: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Number of worker tasks currently alive (0 or 1)
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawn the worker reading from `transport`.
    ///
    /// A no-op returning [`StartOutcome::AlreadyActive`] while running.
    pub fn start(&mut self, transport: SharedTransport) -> StartOutcome {
        if self.state == LoopState::Running {
            debug!("Acquisition already active");
            return StartOutcome::AlreadyActive;
        }

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();

        let worker = Worker {
            transport,
            buffer: Arc::clone(&self.buffer),
            counters: Arc::clone(&self.counters),
            decoder: Arc::clone(&self.decoder),
            timings: self.timings,
            cancel,
        };
        let guard = WorkerGuard::enter(&self.active);

        self.task = Some(tokio::spawn(async move {
            let _guard = guard;
            worker.run().await;
        }));
        self.state = LoopState::Running;

        StartOutcome::Started
    }

    /// Signal the worker and wait for it, at most the stop timeout.
    ///
    /// A worker that does not exit in time is aborted; the call returns
    /// either way. A no-op unless running.
    pub async fn stop(&mut self) {
        if self.state != LoopState::Running {
            return;
        }

        self.state = LoopState::Stopping;
        self.cancel.cancel();

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.timings.stop_timeout, &mut task).await {
                Ok(Ok(())) => debug!("Acquisition worker joined"),
                Ok(Err(e)) => warn!("Acquisition worker ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "Acquisition worker did not exit within {:?}, aborting",
                        self.timings.stop_timeout
                    );
                    task.abort();
                }
            }
        }

        self.state = LoopState::Stopped;
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State moved into the spawned task
struct Worker {
    transport: SharedTransport,
    buffer: Arc<BoundedTelemetryBuffer>,
    counters: Arc<AcquisitionCounters>,
    decoder: Arc<FrameDecoder>,
    timings: LoopTimings,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        info!("Acquisition worker started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                polled = async { self.transport.lock().await.read_line_if_available().await } => polled,
            };

            match polled {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {
                    if !self.pause(self.timings.idle_delay).await {
                        break;
                    }
                }
                Err(e) => {
                    self.counters.record_transport_fault();
                    warn!(
                        "Transport read fault ({} so far): {}",
                        self.counters.transport_faults(),
                        e
                    );
                    if !self.pause(self.timings.fault_backoff).await {
                        break;
                    }
                }
            }
        }

        info!(
            "Acquisition worker stopped (received {}, lost {})",
            self.counters.received(),
            self.counters.lost()
        );
    }

    fn handle_line(&self, line: &str) {
        match self.decoder.decode(line) {
            DecodeOutcome::Record(record) => {
                if self.buffer.push(record) {
                    trace!("Buffer full, dropped oldest record");
                }
                self.counters.record_received();
            }
            DecodeOutcome::Ignored => {}
            DecodeOutcome::Lost(e) => {
                self.counters.record_lost();
                debug!("Frame lost: {}", e);
            }
        }
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
