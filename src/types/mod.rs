//! Core types for acquisition data and health reporting.
//!
//! - [`TelemetryRecord`] is one decoded frame: opaque fields plus timestamps
//! - [`AcquisitionCounters`] are the live atomics written by the acquisition loop
//! - [`AcquisitionStats`] is a read-only snapshot of those counters
//! - [`ConnectionState`] and [`LoopState`] describe the two lifecycles
//! - [`PortDescriptor`] describes an enumerated serial port
//!
//! ## Usage Example
//!
//! ```rust
//! use vibrawatch::types::{AcquisitionCounters, AcquisitionStats};
//!
//! let counters = AcquisitionCounters::new();
//! counters.record_received();
//! counters.record_received();
//! counters.record_received();
//! counters.record_lost();
//!
//! let stats: AcquisitionStats = counters.snapshot(0, 0, 3);
//! assert_eq!(stats.loss_rate(), 0.25);
//! ```

mod port;
mod record;
mod state;
mod stats;

pub use port::PortDescriptor;
pub use record::{DEVICE_TIMESTAMP_FIELD, RECEIPT_TIME_FIELD, RECEIPT_TIME_FORMAT, TelemetryRecord};
pub use state::{AcquisitionStatus, ConnectionState, LoopState, StartOutcome};
pub use stats::{AcquisitionCounters, AcquisitionStats};
