//! Per-bulb output queue and counters
//!
//! Each bulb owns one bounded FIFO of pending pilot vectors. Overflow evicts
//! the oldest entry: newer DMX frames always supersede older ones, so
//! freshness matters more than history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use wizflow_core::PilotState;

/// A pilot vector waiting to be sent, with its off-verification retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedPilot {
    /// The vector to transmit.
    pub pilot: PilotState,
    /// How many times this off-transition has already failed verification.
    pub retry: u8,
}

impl QueuedPilot {
    /// Wrap a fresh vector (no retries yet).
    pub fn new(pilot: PilotState) -> Self {
        Self { pilot, retry: 0 }
    }
}

/// Bounded drop-oldest FIFO.
#[derive(Debug)]
pub struct PilotQueue {
    items: VecDeque<QueuedPilot>,
    capacity: usize,
}

impl PilotQueue {
    /// Create a queue holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting and returning the oldest one on overflow.
    pub fn push(&mut self, item: QueuedPilot) -> Option<QueuedPilot> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<QueuedPilot> {
        self.items.pop_front()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-bulb counters, shared between the pump task and the stats logger.
#[derive(Debug, Default)]
pub struct BulbStats {
    /// Vectors accepted into the queue (including verifier re-enqueues).
    pub queued: AtomicU64,
    /// Pump steps completed through the codec (including suppressed sends).
    pub sent: AtomicU64,
    /// Vectors evicted by drop-oldest overflow.
    pub dropped: AtomicU64,
}

/// A point-in-time copy of [`BulbStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// See [`BulbStats::queued`].
    pub queued: u64,
    /// See [`BulbStats::sent`].
    pub sent: u64,
    /// See [`BulbStats::dropped`].
    pub dropped: u64,
}

impl BulbStats {
    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pilot(r: u8) -> QueuedPilot {
        QueuedPilot::new(PilotState {
            r,
            ..Default::default()
        })
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = PilotQueue::new(10);
        queue.push(pilot(1));
        queue.push(pilot(2));
        assert_eq!(queue.pop(), Some(pilot(1)));
        assert_eq!(queue.pop(), Some(pilot(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        // Twelve distinct frames into a capacity-10 queue: the first two are
        // evicted and frames 3..=12 remain in order.
        let mut queue = PilotQueue::new(10);
        let mut evicted = 0;
        for r in 1..=12u8 {
            if queue.push(pilot(r)).is_some() {
                evicted += 1;
            }
        }
        assert_eq!(evicted, 2);
        assert_eq!(queue.len(), 10);
        for r in 3..=12u8 {
            assert_eq!(queue.pop(), Some(pilot(r)));
        }
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut queue = PilotQueue::new(10);
        for r in 0..=255u8 {
            queue.push(pilot(r));
            assert!(queue.len() <= 10);
        }
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = BulbStats::default();
        stats.queued.fetch_add(5, Ordering::Relaxed);
        stats.sent.fetch_add(2, Ordering::Relaxed);
        stats.dropped.fetch_add(1, Ordering::Relaxed);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                queued: 5,
                sent: 2,
                dropped: 1
            }
        );
    }
}
