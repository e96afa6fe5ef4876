//! Records as exchanged between the engine, record stores and callers.

use crate::domain::keys::RoutingKey;

/// One stored entry, exactly as a record store persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub routing_key: RoutingKey,
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
    /// Present only for kinds that keep full keys
    pub full_key: Option<Vec<u8>>,
    /// Monotonic write sequence, used to restore recency order on reopen
    pub generation: u64,
}

/// Location summary returned by a record store scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSummary {
    pub routing_key: RoutingKey,
    pub generation: u64,
}

/// Raw header/payload pair returned by [`crate::BlockStore::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub routing_key: RoutingKey,
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
    /// The caller's full key when one was supplied, else the stored one
    pub full_key: Option<Vec<u8>>,
}

/// Result of a successful put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was absent and the entry was written.
    Stored,
    /// An existing entry was overwritten.
    Replaced,
    /// An equivalent entry was already present; nothing was written.
    AlreadyPresent,
}
