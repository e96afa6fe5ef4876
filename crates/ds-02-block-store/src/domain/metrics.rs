//! # Store Metrics
//!
//! Monotonic counters for one store. All counters use relaxed atomics; a
//! snapshot is consistent per counter, not across counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the engine.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Fetches that returned an entry
    pub hits: AtomicU64,
    /// Fetches that returned nothing, including corrupt and unconstructable entries
    pub misses: AtomicU64,
    /// Successful new or replacing writes
    pub writes: AtomicU64,
    /// Entries removed to honor the capacity
    pub evictions: AtomicU64,
    /// Entries removed because their bytes failed validation
    pub corrupt_removed: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupt_removal(&self) {
        self.corrupt_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn corrupt_removed(&self) -> u64 {
        self.corrupt_removed.load(Ordering::Relaxed)
    }
}

/// Point-in-time copy of a store's counters and gauges.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub store: String,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub corrupt_removed: u64,
    pub key_count: u64,
    pub max_keys: u64,
    pub bloom_false_positives: u64,
}

impl MetricsSnapshot {
    /// Hits over all fetches, 0.0 before the first fetch.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Export as Prometheus-style metrics string
    pub fn export_prometheus(&self) -> String {
        let store = &self.store;
        format!(
            "# HELP ds02_hits Fetches that returned an entry\n\
             # TYPE ds02_hits counter\n\
             ds02_hits{{store=\"{store}\"}} {}\n\
             # HELP ds02_misses Fetches that returned nothing\n\
             # TYPE ds02_misses counter\n\
             ds02_misses{{store=\"{store}\"}} {}\n\
             # HELP ds02_writes Entries written\n\
             # TYPE ds02_writes counter\n\
             ds02_writes{{store=\"{store}\"}} {}\n\
             # HELP ds02_evictions Entries evicted for capacity\n\
             # TYPE ds02_evictions counter\n\
             ds02_evictions{{store=\"{store}\"}} {}\n\
             # HELP ds02_corrupt_removed Corrupt entries removed\n\
             # TYPE ds02_corrupt_removed counter\n\
             ds02_corrupt_removed{{store=\"{store}\"}} {}\n\
             # HELP ds02_bloom_false_positives Filter hits that missed on disk\n\
             # TYPE ds02_bloom_false_positives counter\n\
             ds02_bloom_false_positives{{store=\"{store}\"}} {}\n\
             # HELP ds02_keys Live entries\n\
             # TYPE ds02_keys gauge\n\
             ds02_keys{{store=\"{store}\"}} {}\n\
             # HELP ds02_max_keys Entry capacity\n\
             # TYPE ds02_max_keys gauge\n\
             ds02_max_keys{{store=\"{store}\"}} {}\n",
            self.hits,
            self.misses,
            self.writes,
            self.evictions,
            self.corrupt_removed,
            self.bloom_false_positives,
            self.key_count,
            self.max_keys,
        )
    }
}
