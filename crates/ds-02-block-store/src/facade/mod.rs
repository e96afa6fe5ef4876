//! # Typed Facades
//!
//! Kind-specific stores built on [`BlockStore`]. Each pairs a main datastore
//! with an optional client-cache tier holding blocks the local node fetched
//! or inserted for its own clients.
//!
//! Fetches try the datastore first and fall back to the client cache only
//! when the caller may read it. Puts go to whichever tiers the caller allows.

mod content_hash;
mod public_key;
mod signed_subspace;

use std::path::Path;
use std::sync::Arc;

use crate::adapters::storage::{FileRecordStore, InMemoryRecordStore};
use crate::domain::config::{NodeStoreConfig, TieredStoreConfig};
use crate::domain::entities::PutOutcome;
use crate::domain::errors::StoreError;
use crate::domain::formats::{Block, BlockKind, ConstructContext, StorableBlock};
use crate::domain::keys::RoutingKey;
use crate::ports::inbound::BlockStoreApi;
use crate::ports::outbound::RecordStore;
use crate::service::BlockStore;

pub use content_hash::ContentHashStore;
pub use public_key::PublicKeyStore;
pub use signed_subspace::SignedSubspaceStore;

/// Per-fetch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFlags {
    /// Leave the entry's recency untouched.
    pub dont_promote: bool,
    /// Fall back to the client cache, and resolve verification keys from it.
    pub can_read_client_cache: bool,
}

impl FetchFlags {
    pub fn local() -> Self {
        Self {
            dont_promote: false,
            can_read_client_cache: true,
        }
    }

    pub fn with_dont_promote(mut self, dont_promote: bool) -> Self {
        self.dont_promote = dont_promote;
        self
    }
}

/// Per-put options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutFlags {
    /// Replace a colliding entry instead of failing.
    pub overwrite: bool,
    pub can_write_client_cache: bool,
    pub can_write_datastore: bool,
}

impl Default for PutFlags {
    fn default() -> Self {
        Self {
            overwrite: false,
            can_write_client_cache: false,
            can_write_datastore: true,
        }
    }
}

impl PutFlags {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_client_cache(mut self, can_write: bool) -> Self {
        self.can_write_client_cache = can_write;
        self
    }

    pub fn with_datastore(mut self, can_write: bool) -> Self {
        self.can_write_datastore = can_write;
        self
    }
}

/// Main datastore plus optional client cache, both of one kind.
pub struct TieredStore<R: RecordStore> {
    main: BlockStore<R>,
    client_cache: Option<BlockStore<R>>,
}

impl<R: RecordStore> TieredStore<R> {
    pub fn new(main: BlockStore<R>, client_cache: Option<BlockStore<R>>) -> Result<Self, StoreError> {
        if let Some(cache) = &client_cache {
            if cache.kind() != main.kind() {
                return Err(StoreError::KindMismatch {
                    expected: main.kind(),
                    actual: cache.kind(),
                });
            }
        }
        Ok(Self { main, client_cache })
    }

    pub fn kind(&self) -> BlockKind {
        self.main.kind()
    }

    pub fn main(&self) -> &BlockStore<R> {
        &self.main
    }

    pub fn client_cache(&self) -> Option<&BlockStore<R>> {
        self.client_cache.as_ref()
    }

    pub fn fetch_block(
        &self,
        routing_key: &RoutingKey,
        flags: FetchFlags,
        ctx: ConstructContext<'_>,
    ) -> Result<Option<Block>, StoreError> {
        let ctx = ctx.with_client_cache(flags.can_read_client_cache);
        if let Some(block) = self.main.fetch_block(routing_key, flags.dont_promote, &ctx)? {
            return Ok(Some(block));
        }
        match &self.client_cache {
            Some(cache) if flags.can_read_client_cache => {
                cache.fetch_block(routing_key, flags.dont_promote, &ctx)
            }
            _ => Ok(None),
        }
    }

    /// Write to every tier `flags` allows.
    ///
    /// Returns the datastore outcome if it was written, else the client-cache
    /// outcome, else `None`.
    pub fn put_block<B: StorableBlock + ?Sized>(
        &self,
        block: &B,
        flags: PutFlags,
    ) -> Result<Option<PutOutcome>, StoreError> {
        let mut outcome = None;
        if flags.can_write_datastore {
            outcome = Some(self.main.put_block(block, flags.overwrite)?);
        }
        if flags.can_write_client_cache {
            if let Some(cache) = &self.client_cache {
                let cached = cache.put_block(block, flags.overwrite)?;
                outcome = outcome.or(Some(cached));
            }
        }
        Ok(outcome)
    }

    /// Filter check across the tiers a fetch with the same flag would read.
    pub fn probably_in_any(&self, routing_key: &RoutingKey, can_read_client_cache: bool) -> bool {
        self.main.probably_in_store(routing_key)
            || (can_read_client_cache
                && self
                    .client_cache
                    .as_ref()
                    .map_or(false, |cache| cache.probably_in_store(routing_key)))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.main.flush()?;
        if let Some(cache) = &self.client_cache {
            cache.flush()?;
        }
        Ok(())
    }

    pub fn shutdown(self) -> Result<(), StoreError> {
        self.main.shutdown()?;
        if let Some(cache) = self.client_cache {
            cache.shutdown()?;
        }
        Ok(())
    }
}

impl TieredStore<InMemoryRecordStore> {
    pub fn in_memory(kind: BlockKind, config: &TieredStoreConfig) -> Result<Self, StoreError> {
        let main = BlockStore::in_memory(kind, config.main.clone())?;
        let client_cache = match &config.client_cache {
            Some(cache) => Some(BlockStore::new(
                kind,
                cache_name(kind),
                InMemoryRecordStore::new(),
                cache.clone(),
            )?),
            None => None,
        };
        Self::new(main, client_cache)
    }
}

impl TieredStore<FileRecordStore> {
    /// Open `<stem>.*` and, if configured, `<stem>-cache.*` under `dir`.
    pub fn open(kind: BlockKind, dir: &Path, config: &TieredStoreConfig) -> Result<Self, StoreError> {
        let main = BlockStore::open(kind, dir, kind.file_stem(), config.main.clone())?;
        let client_cache = match &config.client_cache {
            Some(cache) => Some(BlockStore::open(
                kind,
                dir,
                &cache_name(kind),
                cache.clone(),
            )?),
            None => None,
        };
        Self::new(main, client_cache)
    }
}

fn cache_name(kind: BlockKind) -> String {
    format!("{}-cache", kind.file_stem())
}

/// Capacity and statistics of the main datastore; the client cache is
/// reached through [`TieredStore::client_cache`].
impl<R: RecordStore> BlockStoreApi for TieredStore<R> {
    fn set_max_keys(&self, max_keys: i64, shrink_now: bool) -> Result<(), StoreError> {
        self.main.set_max_keys(max_keys, shrink_now)
    }

    fn max_keys(&self) -> u64 {
        self.main.max_keys()
    }

    fn hits(&self) -> u64 {
        self.main.hits()
    }

    fn misses(&self) -> u64 {
        self.main.misses()
    }

    fn writes(&self) -> u64 {
        self.main.writes()
    }

    fn key_count(&self) -> u64 {
        self.main.key_count()
    }

    fn bloom_false_positive(&self) -> u64 {
        self.main.bloom_false_positive()
    }

    fn probably_in_store(&self, routing_key: &RoutingKey) -> bool {
        self.main.probably_in_store(routing_key)
    }
}

/// Implements `BlockStoreApi` for a facade by delegating to its `tiers` field.
macro_rules! delegate_store_api {
    ($facade:ident) => {
        impl<R: RecordStore> BlockStoreApi for $facade<R> {
            fn set_max_keys(&self, max_keys: i64, shrink_now: bool) -> Result<(), StoreError> {
                self.tiers.set_max_keys(max_keys, shrink_now)
            }

            fn max_keys(&self) -> u64 {
                self.tiers.max_keys()
            }

            fn hits(&self) -> u64 {
                self.tiers.hits()
            }

            fn misses(&self) -> u64 {
                self.tiers.misses()
            }

            fn writes(&self) -> u64 {
                self.tiers.writes()
            }

            fn key_count(&self) -> u64 {
                self.tiers.key_count()
            }

            fn bloom_false_positive(&self) -> u64 {
                self.tiers.bloom_false_positive()
            }

            fn probably_in_store(&self, routing_key: &RoutingKey) -> bool {
                self.tiers.probably_in_store(routing_key)
            }
        }
    };
}

delegate_store_api!(ContentHashStore);
delegate_store_api!(PublicKeyStore);
delegate_store_api!(SignedSubspaceStore);

/// The three typed stores of one node, wired together.
pub struct BlockStores<R: RecordStore> {
    pub content_hash: ContentHashStore<R>,
    pub public_keys: Arc<PublicKeyStore<R>>,
    pub signed_subspace: SignedSubspaceStore<R>,
}

impl<R: RecordStore> BlockStores<R> {
    fn assemble(
        content_hash: TieredStore<R>,
        public_keys: TieredStore<R>,
        signed_subspace: TieredStore<R>,
    ) -> Result<Self, StoreError> {
        let public_keys = Arc::new(PublicKeyStore::new(public_keys)?);
        Ok(Self {
            content_hash: ContentHashStore::new(content_hash)?,
            signed_subspace: SignedSubspaceStore::new(signed_subspace, Arc::clone(&public_keys))?,
            public_keys,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.content_hash.tiers().flush()?;
        self.signed_subspace.tiers().flush()?;
        self.public_keys.tiers().flush()
    }
}

impl BlockStores<InMemoryRecordStore> {
    pub fn in_memory(config: &NodeStoreConfig) -> Result<Self, StoreError> {
        Self::assemble(
            TieredStore::in_memory(BlockKind::ContentHash, &config.content_hash)?,
            TieredStore::in_memory(BlockKind::PublicKey, &config.public_key)?,
            TieredStore::in_memory(BlockKind::SignedSubspace, &config.signed_subspace)?,
        )
    }
}

impl BlockStores<FileRecordStore> {
    pub fn open(dir: &Path, config: &NodeStoreConfig) -> Result<Self, StoreError> {
        tracing::info!("[ds-02] Opening block stores under {}", dir.display());
        Self::assemble(
            TieredStore::open(BlockKind::ContentHash, dir, &config.content_hash)?,
            TieredStore::open(BlockKind::PublicKey, dir, &config.public_key)?,
            TieredStore::open(BlockKind::SignedSubspace, dir, &config.signed_subspace)?,
        )
    }
}

/// Fail unless `tiers` holds `expected` blocks.
fn check_kind<R: RecordStore>(tiers: &TieredStore<R>, expected: BlockKind) -> Result<(), StoreError> {
    if tiers.kind() != expected {
        return Err(StoreError::KindMismatch {
            expected,
            actual: tiers.kind(),
        });
    }
    Ok(())
}
