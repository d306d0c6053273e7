//! Serial telemetry acquisition for vibration sensors.
//!
//! Vibrawatch talks to a microcontroller that prints one JSON object per line
//! over a serial link. It selects and opens the port, runs a background
//! worker that decodes lines into [`TelemetryRecord`]s, and hands them to
//! consumers through a bounded drop-oldest buffer.
//!
//! # Features
//!
//! - **Port discovery**: enumerate ports and auto-detect the device with a pluggable matcher
//! - **Background capture**: one cancellable worker per connection, never blocking callers
//! - **Bounded buffering**: the newest records win when consumers fall behind
//! - **Loss accounting**: malformed frames and read faults are counted, not raised
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vibrawatch::{AcquisitionConfig, ConnectionManager};
//!
//! #[tokio::main]
//! async fn main() -> vibrawatch::Result<()> {
//!     let manager = ConnectionManager::serial(AcquisitionConfig::load(None)?);
//!     let port = manager.connect(None).await?;
//!     manager.start_capture().await?;
//!
//!     while let Some(record) = manager.pop(Duration::from_secs(2)).await {
//!         println!("{port}: rms={:?}", record.f64("rms"));
//!     }
//!
//!     manager.disconnect().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Building blocks
pub mod buffer;
pub mod config;
pub mod decoder;
pub mod matcher;

// Transports and lifecycle
pub mod acquisition;
pub mod connection;
pub mod stream;
pub mod transport;
pub mod transports;

// Core exports
pub use error::*;
pub use types::*;

pub use acquisition::{AcquisitionLoop, LoopTimings, SharedTransport};
pub use buffer::{BoundedBuffer, BoundedTelemetryBuffer};
pub use config::{AcquisitionConfig, LineSettings};
pub use connection::ConnectionManager;
pub use decoder::{DecodeOutcome, FrameDecoder};
pub use matcher::{PortMatcher, VendorMatcher, select_port};
pub use stream::{FeedEvent, live_feed};
pub use transport::{Connector, LineAssembler, Transport};
pub use transports::{MockConnector, MockTransport, SerialConnector, SerialTransport};
