//! # Block Store (ds-02)
//!
//! Persistent, capacity-bounded storage for the fixed-size blocks a node keeps
//! on behalf of the network.
//!
//! ## Block Kinds
//!
//! | Kind | Routing key | Header | Payload | Collisions |
//! |------|-------------|--------|---------|------------|
//! | Content hash | sha256(header ‖ payload) | 36 | 32768 | impossible |
//! | Signed subspace | sha256(docname ‖ pubkey hash) | 102 | 1024 | possible |
//! | Public key | sha256(key) | 0 | 32 | impossible |
//!
//! ## Guarantees
//!
//! - Blocks are re-verified on every fetch; unverifiable bytes are removed.
//! - The membership filter never answers "absent" for a stored key.
//! - At most `max_keys` entries are held; the least recently used go first.
//! - Recency survives a restart (write order), the filter image too.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Keys, block formats, recency index, config, errors
//! - `ports/` - `BlockStoreApi` (inbound), `RecordStore` (outbound)
//! - `adapters/` - Slot file and in-memory record stores, process lock
//! - `service/` - The generic engine, [`BlockStore`]
//! - `facade/` - Typed stores with a client-cache tier
//!
//! ## Usage
//!
//! ```ignore
//! use ds_02_block_store::{BlockStores, ContentHashBlock, FetchFlags, NodeStoreConfig, PutFlags};
//!
//! let stores = BlockStores::open(dir, &NodeStoreConfig::default())?;
//! let block = ContentHashBlock::encode(b"hello")?;
//! stores.content_hash.put(&block, PutFlags::default())?;
//! let fetched = stores.content_hash.fetch(&block.key(), FetchFlags::default())?;
//! ```

pub mod adapters;
pub mod domain;
pub mod facade;
pub mod ports;
pub mod service;

#[cfg(test)]
mod test_utils;

pub use adapters::lock::{DatabaseLock, LockError};
pub use adapters::storage::{FileRecordStore, InMemoryRecordStore};
pub use domain::config::{NodeStoreConfig, StoreConfig, TieredStoreConfig};
pub use domain::entities::{PutOutcome, RawEntry, RecordSummary, StoredRecord};
pub use domain::errors::{StoreError, StoreIoError, VerifyError};
pub use domain::eviction::RecencyIndex;
pub use domain::formats::{
    Block, BlockKind, ConstructContext, ContentHashBlock, ContentHashKey, FormatSpec,
    PublicKeyRecord, PublicKeySource, SignedSubspaceBlock, StorableBlock, SubspaceKey,
};
pub use domain::keys::RoutingKey;
pub use domain::metrics::MetricsSnapshot;
pub use facade::{
    BlockStores, ContentHashStore, FetchFlags, PublicKeyStore, PutFlags, SignedSubspaceStore,
    TieredStore,
};
pub use ports::{BlockStoreApi, RecordStore};
pub use service::BlockStore;
