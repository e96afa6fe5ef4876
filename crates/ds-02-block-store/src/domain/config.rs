//! # Store Configuration
//!
//! Per-store settings. A node usually runs one store per block kind, each
//! optionally paired with a client-cache tier ([`TieredStoreConfig`]).

use std::env;

use ds_01_membership_filter::domain::config::DEFAULT_MAX_SIZE_BITS;
use ds_01_membership_filter::FilterConfig;
use serde::{Deserialize, Serialize};

use crate::domain::errors::StoreError;

/// Configuration for a single block store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of entries kept (default: 100 000).
    pub max_keys: u64,

    /// Target false-positive rate of the membership filter (default: 1%).
    pub bloom_target_fpr: f64,

    /// Upper bound on the filter bit array.
    pub bloom_max_size_bits: u64,

    /// Number of per-key lock stripes (default: 256).
    pub key_lock_stripes: usize,

    /// Flush record files to disk after every write (default: false).
    pub sync_writes: bool,

    /// Rebuild the filter once stale entries exceed this fraction of its
    /// capacity (default: 0.5).
    pub stale_rebuild_ratio: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_keys: 100_000,
            bloom_target_fpr: 0.01,
            bloom_max_size_bits: DEFAULT_MAX_SIZE_BITS,
            key_lock_stripes: 256,
            sync_writes: false,
            stale_rebuild_ratio: 0.5,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the environment, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `DS_MAX_KEYS`: Entry capacity (default: 100000)
    /// - `DS_BLOOM_FPR`: Filter false-positive target (default: 0.01)
    /// - `DS_KEY_LOCK_STRIPES`: Lock stripes (default: 256)
    /// - `DS_SYNC_WRITES`: Sync after each write (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_keys: env_parse("DS_MAX_KEYS").unwrap_or(defaults.max_keys),
            bloom_target_fpr: env_parse("DS_BLOOM_FPR").unwrap_or(defaults.bloom_target_fpr),
            key_lock_stripes: env_parse("DS_KEY_LOCK_STRIPES")
                .unwrap_or(defaults.key_lock_stripes),
            sync_writes: env::var("DS_SYNC_WRITES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.sync_writes),
            ..defaults
        }
    }

    pub fn with_max_keys(mut self, max_keys: u64) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn with_bloom_target_fpr(mut self, fpr: f64) -> Self {
        self.bloom_target_fpr = fpr;
        self
    }

    pub fn with_bloom_max_size_bits(mut self, bits: u64) -> Self {
        self.bloom_max_size_bits = bits;
        self
    }

    pub fn with_key_lock_stripes(mut self, stripes: usize) -> Self {
        self.key_lock_stripes = stripes;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_stale_rebuild_ratio(mut self, ratio: f64) -> Self {
        self.stale_rebuild_ratio = ratio;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.key_lock_stripes == 0 {
            return Err(StoreError::Config(
                "key_lock_stripes must be at least 1".to_string(),
            ));
        }
        if !(self.stale_rebuild_ratio > 0.0) {
            return Err(StoreError::Config(format!(
                "stale_rebuild_ratio must be positive, got {}",
                self.stale_rebuild_ratio
            )));
        }
        self.filter_config(self.max_keys).validate()?;
        Ok(())
    }

    /// Filter configuration sized for `expected_keys` entries, or for as many
    /// as fit under `bloom_max_size_bits` if that is fewer.
    pub fn filter_config(&self, expected_keys: u64) -> FilterConfig {
        let config = FilterConfig {
            expected_keys,
            target_fpr: self.bloom_target_fpr,
            max_size_bits: self.bloom_max_size_bits,
        }
        .capped_to_ceiling();
        let expected_keys = config.expected_keys.max(1);
        FilterConfig {
            expected_keys,
            ..config
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("[ds-02] Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

/// Main store plus optional client-cache tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredStoreConfig {
    pub main: StoreConfig,
    pub client_cache: Option<StoreConfig>,
}

impl TieredStoreConfig {
    pub fn new(main: StoreConfig) -> Self {
        Self {
            main,
            client_cache: None,
        }
    }

    pub fn with_client_cache(mut self, cache: StoreConfig) -> Self {
        self.client_cache = Some(cache);
        self
    }
}

/// Tiered configuration for every block kind a node stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStoreConfig {
    pub content_hash: TieredStoreConfig,
    pub signed_subspace: TieredStoreConfig,
    pub public_key: TieredStoreConfig,
}

impl NodeStoreConfig {
    /// Same tiers for every kind.
    pub fn uniform(config: TieredStoreConfig) -> Self {
        Self {
            content_hash: config.clone(),
            signed_subspace: config.clone(),
            public_key: config,
        }
    }
}
