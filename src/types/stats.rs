//! Acquisition counters and their snapshots

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the acquisition loop.
///
/// Only the loop writes; everyone else reads through [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct AcquisitionCounters {
    received: AtomicU64,
    lost: AtomicU64,
    transport_faults: AtomicU64,
}

impl AcquisitionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    /// A transport read fault is counted as a lost frame as well.
    pub fn record_transport_fault(&self) {
        self.transport_faults.fetch_add(1, Ordering::Relaxed);
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    pub fn transport_faults(&self) -> u64 {
        self.transport_faults.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.received.store(0, Ordering::Relaxed);
        self.lost.store(0, Ordering::Relaxed);
        self.transport_faults.store(0, Ordering::Relaxed);
    }

    /// Build a snapshot, filling in the buffer-side figures supplied by the caller.
    pub fn snapshot(&self, ignored: u64, dropped: u64, buffer_size: usize) -> AcquisitionStats {
        AcquisitionStats {
            received: self.received(),
            lost: self.lost(),
            transport_faults: self.transport_faults(),
            ignored,
            dropped,
            buffer_size,
        }
    }
}

/// Point-in-time view of acquisition health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AcquisitionStats {
    /// Frames decoded and buffered
    pub received: u64,
    /// Frames lost to decode failures or transport read faults
    pub lost: u64,
    /// Transport read faults (included in `lost`)
    pub transport_faults: u64,
    /// Non-data lines skipped by the decoder
    pub ignored: u64,
    /// Records evicted by the drop-oldest policy
    pub dropped: u64,
    /// Buffer occupancy when the snapshot was taken
    pub buffer_size: usize,
}

impl AcquisitionStats {
    /// Fraction of frame attempts that were lost, `0.0` when nothing was seen.
    pub fn loss_rate(&self) -> f64 {
        let attempts = self.received + self.lost;
        if attempts == 0 { 0.0 } else { self.lost as f64 / attempts as f64 }
    }

    /// Loss rate as a percentage
    pub fn loss_percent(&self) -> f64 {
        self.loss_rate() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn loss_rate_is_zero_without_attempts() {
        let stats = AcquisitionStats::default();
        assert_eq!(stats.loss_rate(), 0.0);
        assert_eq!(stats.loss_percent(), 0.0);
    }

    #[test]
    fn transport_faults_count_as_loss() {
        let counters = AcquisitionCounters::new();
        counters.record_received();
        counters.record_received();
        counters.record_received();
        counters.record_transport_fault();

        let stats = counters.snapshot(0, 0, 3);
        assert_eq!(stats.lost, 1);
        assert_eq!(stats.transport_faults, 1);
        assert!((stats.loss_rate() - 0.25).abs() < f64::EPSILON);
        assert!((stats.loss_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_counters() {
        let counters = AcquisitionCounters::new();
        counters.record_lost();
        counters.record_received();
        counters.reset();
        assert_eq!(counters.snapshot(0, 0, 0), AcquisitionStats::default());
    }

    proptest! {
        #[test]
        fn loss_rate_matches_definition(received in 0u64..100_000, lost in 0u64..100_000) {
            let stats = AcquisitionStats { received, lost, ..Default::default() };
            let rate = stats.loss_rate();

            prop_assert!((0.0..=1.0).contains(&rate));
            if received + lost == 0 {
                prop_assert_eq!(rate, 0.0);
            } else {
                let expected = lost as f64 / (received + lost) as f64;
                prop_assert!((rate - expected).abs() < 1e-12);
            }
        }
    }
}
