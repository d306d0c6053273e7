//! Line decoder for device frames.
//!
//! The device prints one JSON object per line. Anything that is not shaped
//! like an object (boot banners, debug prints, partial lines after a reset)
//! is skipped without being counted as loss. A line that looks like an
//! object but does not parse is a lost frame.

use chrono::Local;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::types::TelemetryRecord;
use crate::AcquisitionError;

/// Result of decoding one line
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A well-formed frame
    Record(TelemetryRecord),
    /// Not a data line; no penalty
    Ignored,
    /// Shaped like a frame but malformed
    Lost(AcquisitionError),
}

impl DecodeOutcome {
    pub fn is_record(&self) -> bool {
        matches!(self, DecodeOutcome::Record(_))
    }

    pub fn into_record(self) -> Option<TelemetryRecord> {
        match self {
            DecodeOutcome::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Decodes device lines into [`TelemetryRecord`]s.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    ignored: AtomicU64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line, stamping successful records with the local receipt time.
    pub fn decode(&self, line: &str) -> DecodeOutcome {
        let line = line.trim();

        if !Self::is_frame(line) {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            trace!("Skipping non-data line ({} bytes)", line.len());
            return DecodeOutcome::Ignored;
        }

        match serde_json::from_str::<Map<String, Value>>(line) {
            Ok(fields) => DecodeOutcome::Record(TelemetryRecord::new(fields, Local::now())),
            Err(e) => DecodeOutcome::Lost(AcquisitionError::decode(e.to_string())),
        }
    }

    /// Number of non-data lines skipped so far
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.ignored.store(0, Ordering::Relaxed);
    }

    fn is_frame(line: &str) -> bool {
        line.starts_with('{') && line.ends_with('}')
    }
}
