//! # Membership Filter Service
//!
//! Wraps a [`BloomFilter`] for concurrent use by many fetch/put threads.
//!
//! - Probes take the read lock only; inserts and rebuilds take the write lock.
//! - Counters live outside the lock and survive rebuilds, so they are
//!   monotonic for the lifetime of the process.
//!
//! Removal is not supported. The owner reports evictions through
//! [`MembershipFilter::mark_stale`] and decides when a rebuild is worth it.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::domain::{BloomFilter, FilterConfig};
use crate::error::FilterError;

/// Magic prefix of a saved filter image.
const IMAGE_MAGIC: &[u8; 8] = b"DSBLOOM1";
/// magic + crc32 + live_keys + body_len
const IMAGE_HEADER_LEN: usize = 8 + 4 + 8 + 8;

struct FilterState {
    bloom: BloomFilter,
    config: FilterConfig,
}

/// Point-in-time view of filter geometry and observed accuracy.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterStats {
    pub size_bits: usize,
    pub hash_count: usize,
    pub capacity: u64,
    pub elements_inserted: u64,
    /// FPR predicted from the current load, stale entries included
    pub estimated_fpr: f64,
    pub probes: u64,
    pub definite_negatives: u64,
    /// Probes answered "maybe" that the owner then missed on disk
    pub false_positives: u64,
    /// Share of all misses that cost a disk lookup because of a false positive
    pub false_positive_ratio: f64,
    pub stale_entries: u64,
    pub rebuilds: u64,
}

/// Concurrent routing-key membership filter.
pub struct MembershipFilter {
    state: RwLock<FilterState>,
    probes: AtomicU64,
    negatives: AtomicU64,
    false_positives: AtomicU64,
    stale: AtomicU64,
    rebuilds: AtomicU64,
}

impl MembershipFilter {
    /// Empty filter sized by `config`, with a fresh random salt.
    pub fn new(config: FilterConfig) -> Result<Self, FilterError> {
        let bloom = BloomFilter::with_params(config.params()?, rand::random());
        Ok(Self::from_parts(bloom, config))
    }

    fn from_parts(bloom: BloomFilter, config: FilterConfig) -> Self {
        Self {
            state: RwLock::new(FilterState { bloom, config }),
            probes: AtomicU64::new(0),
            negatives: AtomicU64::new(0),
            false_positives: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// `false` is a hard guarantee of absence; `true` is only a hint.
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let hit = self.state.read().bloom.contains(key);
        if !hit {
            self.negatives.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Mark `key` present.
    pub fn insert(&self, key: &[u8]) {
        self.state.write().bloom.insert(key);
    }

    /// The owner probed, got "maybe", and missed on disk.
    pub fn record_false_positive(&self) {
        self.false_positives.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` keys left the owner's key set but stay set in the filter.
    pub fn mark_stale(&self, count: u64) {
        self.stale.fetch_add(count, Ordering::Relaxed);
    }

    /// Keys removed by the owner since the last rebuild.
    pub fn stale_entries(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    /// Number of keys the current bit array was sized for.
    pub fn capacity(&self) -> u64 {
        self.state.read().config.expected_keys
    }

    /// Observed false positives since process start.
    pub fn false_positive_count(&self) -> u64 {
        self.false_positives.load(Ordering::Relaxed)
    }

    /// Replace the filter with one built from `keys`, sized for `expected_keys`.
    ///
    /// The caller must stop concurrent inserts for the duration (the block
    /// store holds its recency lock), otherwise an insert racing the swap is
    /// lost and becomes a false negative.
    pub fn rebuild<I>(&self, keys: I, expected_keys: u64) -> Result<(), FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let config = self.state.read().config.clone().with_expected_keys(expected_keys);
        let mut bloom = BloomFilter::with_params(config.params()?, rand::random());
        let mut inserted = 0u64;
        for key in keys {
            bloom.insert(key.as_ref());
            inserted += 1;
        }

        *self.state.write() = FilterState { bloom, config };
        self.stale.store(0, Ordering::Relaxed);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            "[ds-01] Membership filter rebuilt: {} keys, capacity {}",
            inserted,
            expected_keys
        );
        Ok(())
    }

    /// Snapshot of geometry and counters.
    pub fn stats(&self) -> FilterStats {
        let state = self.state.read();
        let negatives = self.negatives.load(Ordering::Relaxed);
        let false_positives = self.false_positives.load(Ordering::Relaxed);
        let misses = negatives + false_positives;
        FilterStats {
            size_bits: state.bloom.size_bits(),
            hash_count: state.bloom.hash_count(),
            capacity: state.config.expected_keys,
            elements_inserted: state.bloom.elements_inserted(),
            estimated_fpr: state.bloom.estimated_fpr(),
            probes: self.probes.load(Ordering::Relaxed),
            definite_negatives: negatives,
            false_positives,
            false_positive_ratio: if misses == 0 {
                0.0
            } else {
                false_positives as f64 / misses as f64
            },
            stale_entries: self.stale.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }

    /// Write the filter image to `path` (temp file + rename).
    ///
    /// `live_keys` is stored alongside so the loader can detect that the key
    /// set moved on after the image was written.
    pub fn save(&self, path: &Path, live_keys: u64) -> Result<(), FilterError> {
        let body = self.state.read().bloom.to_bytes()?;

        let mut image = Vec::with_capacity(IMAGE_HEADER_LEN + body.len());
        image.extend_from_slice(IMAGE_MAGIC);
        image.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        image.extend_from_slice(&live_keys.to_le_bytes());
        image.extend_from_slice(&(body.len() as u64).to_le_bytes());
        image.extend_from_slice(&body);

        let temp_path = path.with_extension("bloom.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&image)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        tracing::debug!("[ds-01] Saved filter image to {}", path.display());
        Ok(())
    }

    /// Load an image written by [`save`](Self::save).
    ///
    /// Returns the filter and the live key count recorded at save time. An
    /// image whose geometry differs from what `config` asks for is rejected
    /// as corrupt so the caller rebuilds instead.
    pub fn load(path: &Path, config: FilterConfig) -> Result<(Self, u64), FilterError> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < IMAGE_HEADER_LEN || &bytes[..8] != IMAGE_MAGIC {
            return Err(FilterError::Corrupt("bad magic".to_string()));
        }
        let crc = u32::from_le_bytes(read_array(&bytes[8..12]));
        let live_keys = u64::from_le_bytes(read_array(&bytes[12..20]));
        let body_len = u64::from_le_bytes(read_array(&bytes[20..28])) as usize;
        let body = &bytes[IMAGE_HEADER_LEN..];
        if body.len() != body_len || crc32fast::hash(body) != crc {
            return Err(FilterError::Corrupt("checksum mismatch".to_string()));
        }

        let bloom = BloomFilter::from_bytes(body)?;
        let params = config.params()?;
        if bloom.size_bits() != params.size_bits || bloom.hash_count() != params.hash_count {
            return Err(FilterError::Corrupt(format!(
                "geometry mismatch: image m={} k={}, config m={} k={}",
                bloom.size_bits(),
                bloom.hash_count(),
                params.size_bits,
                params.hash_count
            )));
        }

        Ok((Self::from_parts(bloom, config), live_keys))
    }
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
