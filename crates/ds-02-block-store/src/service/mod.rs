//! # Block Store Engine
//!
//! One `BlockStore` holds blocks of a single kind over a [`RecordStore`]. It
//! owns the recency order, the membership filter and the capacity limit; the
//! record store only persists bytes.
//!
//! ## Locking
//!
//! Operations on one routing key are serialized by a striped key lock. The
//! recency index and the filter have their own locks and are always taken in
//! the order stripe, recency, filter. Eviction picks its victim under the
//! recency lock, releases it, then takes the victim's stripe.

mod engine;
mod filter;
mod locks;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ds_01_membership_filter::{FilterStats, MembershipFilter};
use parking_lot::Mutex;

use crate::adapters::storage::{FileRecordStore, InMemoryRecordStore};
use crate::domain::config::StoreConfig;
use crate::domain::errors::StoreError;
use crate::domain::eviction::RecencyIndex;
use crate::domain::formats::BlockKind;
use crate::domain::keys::RoutingKey;
use crate::domain::metrics::{MetricsSnapshot, StoreMetrics};
use crate::ports::inbound::BlockStoreApi;
use crate::ports::outbound::RecordStore;

use locks::KeyLocks;

/// Capacity-bounded store for blocks of one kind.
pub struct BlockStore<R: RecordStore> {
    kind: BlockKind,
    name: String,
    records: R,
    filter: MembershipFilter,
    recency: Mutex<RecencyIndex>,
    key_locks: KeyLocks,
    max_keys: AtomicU64,
    next_generation: AtomicU64,
    metrics: StoreMetrics,
    config: StoreConfig,
    /// Filter image location; `None` keeps the filter in memory only
    filter_path: Option<PathBuf>,
    filter_saved: AtomicBool,
}

impl<R: RecordStore> BlockStore<R> {
    /// Wrap `records`, restoring recency order and the filter from its contents.
    ///
    /// If the records exceed `config.max_keys`, the oldest are evicted now.
    pub fn new(
        kind: BlockKind,
        name: impl Into<String>,
        records: R,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        Self::assemble(kind, name.into(), records, config, None)
    }

    fn assemble(
        kind: BlockKind,
        name: String,
        records: R,
        config: StoreConfig,
        filter_path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        config.validate()?;

        let summaries = records.scan()?;
        let live = summaries.len() as u64;
        let next_generation = summaries
            .iter()
            .map(|summary| summary.generation + 1)
            .max()
            .unwrap_or(0);
        let recency = RecencyIndex::from_generations(
            summaries
                .iter()
                .map(|summary| (summary.routing_key, summary.generation))
                .collect(),
        );

        let persisted = filter_path
            .as_deref()
            .and_then(|path| filter::load_persisted(path, &config, live));
        let filter = match persisted {
            Some(filter) => filter,
            None => {
                let filter =
                    MembershipFilter::new(config.filter_config(config.max_keys.max(live)))?;
                for key in recency.keys() {
                    filter.insert(key.as_ref());
                }
                filter
            }
        };

        let store = Self {
            kind,
            key_locks: KeyLocks::new(config.key_lock_stripes),
            max_keys: AtomicU64::new(config.max_keys),
            next_generation: AtomicU64::new(next_generation),
            metrics: StoreMetrics::new(),
            recency: Mutex::new(recency),
            records,
            filter,
            filter_path,
            filter_saved: AtomicBool::new(false),
            config,
            name,
        };

        let evicted = store.enforce_capacity()?;
        tracing::info!(
            "[ds-02] {} store '{}' ready: {} keys, capacity {}{}",
            store.kind,
            store.name,
            store.key_count(),
            store.max_keys(),
            if evicted > 0 {
                format!(", {} evicted on open", evicted)
            } else {
                String::new()
            }
        );
        Ok(store)
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn evictions(&self) -> u64 {
        self.metrics.evictions()
    }

    pub fn corrupt_removed(&self) -> u64 {
        self.metrics.corrupt_removed()
    }

    pub fn filter_stats(&self) -> FilterStats {
        self.filter.stats()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            store: self.name.clone(),
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            writes: self.metrics.writes(),
            evictions: self.metrics.evictions(),
            corrupt_removed: self.metrics.corrupt_removed(),
            key_count: self.key_count(),
            max_keys: self.max_keys(),
            bloom_false_positives: self.filter.false_positive_count(),
        }
    }

    /// Make every completed write durable.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.records.flush()?;
        Ok(())
    }

    /// Flush and save the filter image, reporting failures that a plain drop
    /// would only log.
    pub fn shutdown(self) -> Result<(), StoreError> {
        self.persist_filter()
    }
}

impl BlockStore<InMemoryRecordStore> {
    /// Ephemeral store; nothing survives a drop.
    pub fn in_memory(kind: BlockKind, config: StoreConfig) -> Result<Self, StoreError> {
        Self::new(kind, kind.file_stem(), InMemoryRecordStore::new(), config)
    }
}

impl BlockStore<FileRecordStore> {
    /// Open or create store `name` under `dir`.
    ///
    /// A filter image saved by a clean shutdown is loaded and then deleted, so
    /// a crash before the next clean shutdown forces a rebuild from the records.
    pub fn open(
        kind: BlockKind,
        dir: &Path,
        name: &str,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let records = FileRecordStore::open(dir, name, kind.spec(), config.sync_writes)?;
        let filter_path = dir.join(format!("{name}.bloom"));
        Self::assemble(kind, name.to_string(), records, config, Some(filter_path))
    }
}

impl<R: RecordStore> BlockStoreApi for BlockStore<R> {
    fn set_max_keys(&self, max_keys: i64, shrink_now: bool) -> Result<(), StoreError> {
        let new_max =
            u64::try_from(max_keys).map_err(|_| StoreError::Capacity { requested: max_keys })?;
        let sized_for = self.config.filter_config(new_max).expected_keys;
        if sized_for < new_max {
            tracing::warn!(
                "[ds-02] '{}' filter capped at {} keys for capacity {}; false positives will exceed {}",
                self.name,
                sized_for,
                new_max,
                self.config.bloom_target_fpr
            );
        }
        if sized_for > self.filter.capacity() {
            self.rebuild_filter_for(new_max)?;
        }
        let previous = self.max_keys.swap(new_max, Ordering::SeqCst);
        tracing::info!(
            "[ds-02] '{}' capacity {} -> {} (shrink_now={})",
            self.name,
            previous,
            new_max,
            shrink_now
        );
        if shrink_now && new_max < previous {
            let evicted = self.enforce_capacity()?;
            tracing::info!("[ds-02] '{}' shrank by {} entries", self.name, evicted);
        }
        Ok(())
    }

    fn max_keys(&self) -> u64 {
        self.max_keys.load(Ordering::SeqCst)
    }

    fn hits(&self) -> u64 {
        self.metrics.hits()
    }

    fn misses(&self) -> u64 {
        self.metrics.misses()
    }

    fn writes(&self) -> u64 {
        self.metrics.writes()
    }

    fn key_count(&self) -> u64 {
        self.recency.lock().len() as u64
    }

    fn bloom_false_positive(&self) -> u64 {
        self.filter.false_positive_count()
    }

    fn probably_in_store(&self, routing_key: &RoutingKey) -> bool {
        self.filter.might_contain(routing_key.as_ref())
    }
}

impl<R: RecordStore> Drop for BlockStore<R> {
    fn drop(&mut self) {
        if let Err(e) = self.persist_filter() {
            tracing::warn!("[ds-02] '{}' shutdown incomplete: {}", self.name, e);
        }
    }
}
