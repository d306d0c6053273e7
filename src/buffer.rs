//! Bounded drop-oldest buffer between the acquisition loop and consumers.
//!
//! The producer never waits: when the buffer is full the oldest record is
//! evicted to make room, so a slow consumer always sees the most recent
//! data. Consumers wait with a timeout; an empty buffer is an expected
//! condition and yields `None`, not an error.
//!
//! Storage sits behind one short-held mutex. Waiting happens outside that
//! lock on a [`Notify`] that every push signals.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::types::TelemetryRecord;

/// Default number of records held before the oldest is dropped
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Buffer of decoded telemetry records
pub type BoundedTelemetryBuffer = BoundedBuffer<TelemetryRecord>;

#[derive(Debug)]
struct Slots<T> {
    items: VecDeque<T>,
    dropped: u64,
}

/// Fixed-capacity FIFO with drop-oldest overflow and timed waits.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    slots: Mutex<Slots<T>>,
    available: Notify,
    capacity: usize,
}

impl<T> Default for BoundedBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> BoundedBuffer<T> {
    /// Create a buffer holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(Slots { items: VecDeque::with_capacity(capacity), dropped: 0 }),
            available: Notify::new(),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item, evicting the oldest one if full.
    ///
    /// Returns `true` when an item was evicted.
    pub fn push(&self, item: T) -> bool {
        let evicted = {
            let mut slots = self.lock();
            let evicted = if slots.items.len() >= self.capacity {
                slots.items.pop_front();
                slots.dropped += 1;
                true
            } else {
                false
            };
            slots.items.push_back(item);
            evicted
        };

        self.available.notify_one();
        evicted
    }

    /// Remove the oldest item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Wait up to `timeout` for the oldest item.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub async fn pop(&self, timeout: Duration) -> Option<T> {
        self.pop_until(deadline_after(timeout)).await
    }

    async fn pop_until(&self, deadline: Option<Instant>) -> Option<T> {
        loop {
            // Register interest before checking so a push in between is not missed
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.try_pop();
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Collect up to `count` items, waiting at most `total_timeout` overall.
    pub async fn pop_batch(&self, count: usize, total_timeout: Duration) -> Vec<T> {
        let deadline = deadline_after(total_timeout);
        let mut batch = Vec::with_capacity(count.min(self.capacity));

        while batch.len() < count {
            match self.pop_until(deadline).await {
                Some(item) => batch.push(item),
                None => break,
            }
        }

        batch
    }

    /// Discard everything currently buffered, returning how many items were dropped.
    pub fn clear(&self) -> usize {
        let mut slots = self.lock();
        let cleared = slots.items.len();
        slots.items.clear();
        cleared
    }

    /// Current occupancy. Advisory: may be stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Alias for [`len`](Self::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items evicted by the overflow policy since creation or the last reset
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn reset_dropped(&self) {
        self.lock().dropped = 0;
    }
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}
