//! # Delivery counters.
//!
//! [`DeliveryStats`] is a set of relaxed atomic counters kept once per registry and
//! once per subscriber. Readers take a [`StatsSnapshot`]; counters are independent,
//! so a snapshot taken during a fan-out may be mid-update across fields.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for one registry or one subscriber.
#[derive(Debug, Default)]
pub(crate) struct DeliveryStats {
    published: AtomicU64,
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

impl DeliveryStats {
    #[inline]
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of delivery counters.
///
/// `published` is only counted at registry level (one per publish call that
/// reached fan-out); the other fields are per queue entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages that went through fan-out.
    pub published: u64,
    /// Queue entries created by fan-out.
    pub enqueued: u64,
    /// Messages handed to a handler that returned `Ok`, or to a `next()` caller.
    pub delivered: u64,
    /// Handler errors, panics and timeouts.
    pub failures: u64,
    /// Messages evicted under `DropOldest`.
    pub dropped: u64,
    /// Queue entries refused under `Reject`.
    pub rejected: u64,
}
