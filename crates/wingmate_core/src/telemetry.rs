//! Counters exported to an external telemetry collector.
//!
//! The repository only produces numbers; formatting and shipping them is up
//! to whichever [`TelemetrySink`] the caller hands over.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

use crate::repository::LoadStats;

/// Receiver for numeric counters.
pub trait TelemetrySink {
    /// Records one named value.
    fn record(&self, name: &'static str, value: f64);
}

/// Sink that writes each counter as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, name: &'static str, value: f64) {
        info!(counter = name, value, "telemetry");
    }
}

/// Point-in-time view of repository activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Records served from the cache after a matching fingerprint.
    pub cache_hits: u64,
    /// Records that had to be read (missing or stale).
    pub cache_misses: u64,
    /// Successful parses.
    pub parses: u64,
    /// Records that failed to load.
    pub load_errors: u64,
    /// Unique records in the most recent batch.
    pub last_batch_size: u64,
    /// Records currently cached.
    pub entries: u64,
}

impl MetricsSnapshot {
    /// Fraction of lookups served from the cache, 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Sends every counter to `sink`.
    pub fn emit(&self, sink: &dyn TelemetrySink) {
        sink.record("cache_hits", self.cache_hits as f64);
        sink.record("cache_misses", self.cache_misses as f64);
        sink.record("cache_hit_rate", self.hit_rate());
        sink.record("parses", self.parses as f64);
        sink.record("load_errors", self.load_errors as f64);
        sink.record("batch_size", self.last_batch_size as f64);
        sink.record("cache_entries", self.entries as f64);
    }
}

/// Lock-free counters owned by a repository.
#[derive(Debug, Default)]
pub(crate) struct RepositoryMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    parses: AtomicU64,
    load_errors: AtomicU64,
    last_batch_size: AtomicU64,
}

impl RepositoryMetrics {
    pub(crate) fn record_batch(&self, stats: &LoadStats, misses: usize) {
        self.cache_hits
            .fetch_add(stats.reused as u64, Ordering::Relaxed);
        self.cache_misses.fetch_add(misses as u64, Ordering::Relaxed);
        self.parses.fetch_add(stats.parsed as u64, Ordering::Relaxed);
        self.load_errors
            .fetch_add(stats.failed as u64, Ordering::Relaxed);
        self.last_batch_size
            .store(stats.unique as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
            load_errors: self.load_errors.load(Ordering::Relaxed),
            last_batch_size: self.last_batch_size.load(Ordering::Relaxed),
            entries: entries as u64,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_sink {
    use parking_lot::Mutex;

    use super::TelemetrySink;

    /// Sink that keeps everything it receives.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) records: Mutex<Vec<(&'static str, f64)>>,
    }

    impl RecordingSink {
        pub(crate) fn value(&self, name: &str) -> Option<f64> {
            self.records
                .lock()
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, name: &'static str, value: f64) {
            self.records.lock().push((name, value));
        }
    }
}
