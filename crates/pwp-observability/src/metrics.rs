//! Worker-level counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters shared by every component of one worker.
///
/// Cheap to update from detached tasks; read with `snapshot`.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_failures: AtomicU64,
    no_response: AtomicU64,
    change_notifications: AtomicU64,
    cache_writes: AtomicU64,
    composed_pages: AtomicU64,
    deferred_submissions: AtomicU64,
    drain_cycles: AtomicU64,
    replays_succeeded: AtomicU64,
    replays_failed: AtomicU64,
}

/// Point-in-time copy of `WorkerMetrics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_failures: u64,
    pub no_response: u64,
    pub change_notifications: u64,
    pub cache_writes: u64,
    pub composed_pages: u64,
    pub deferred_submissions: u64,
    pub drain_cycles: u64,
    pub replays_succeeded: u64,
    pub replays_failed: u64,
}

impl MetricsSnapshot {
    /// Fraction of lookups served from cache, if any lookups happened.
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            None
        } else {
            Some(self.cache_hits as f64 / total as f64)
        }
    }
}

impl WorkerMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_failure(&self) {
        self.network_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_response(&self) {
        self.no_response.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change_notification(&self) {
        self.change_notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_composed_page(&self) {
        self.composed_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deferred_submission(&self) {
        self.deferred_submissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one drain cycle and its per-entry outcomes.
    pub fn record_drain(&self, succeeded: u64, failed: u64) {
        self.drain_cycles.fetch_add(1, Ordering::Relaxed);
        self.replays_succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.replays_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            no_response: self.no_response.load(Ordering::Relaxed),
            change_notifications: self.change_notifications.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            composed_pages: self.composed_pages.load(Ordering::Relaxed),
            deferred_submissions: self.deferred_submissions.load(Ordering::Relaxed),
            drain_cycles: self.drain_cycles.load(Ordering::Relaxed),
            replays_succeeded: self.replays_succeeded.load(Ordering::Relaxed),
            replays_failed: self.replays_failed.load(Ordering::Relaxed),
        }
    }
}
