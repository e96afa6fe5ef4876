//! # Inbound Ports (Driving Ports)
//!
//! Capacity and statistics surface shared by the engine and every facade.
//! Kind-specific fetch and put live on the facades themselves, since their
//! key and block types differ.

use crate::domain::errors::StoreError;
use crate::domain::keys::RoutingKey;

pub trait BlockStoreApi {
    /// Change the entry limit.
    ///
    /// Negative values are rejected with `StoreError::Capacity`. Shrinking with
    /// `shrink_now` evicts least-recently-used entries until the store fits;
    /// without it the excess is evicted by later puts. Growing never evicts.
    fn set_max_keys(&self, max_keys: i64, shrink_now: bool) -> Result<(), StoreError>;

    fn max_keys(&self) -> u64;

    fn hits(&self) -> u64;

    fn misses(&self) -> u64;

    fn writes(&self) -> u64;

    fn key_count(&self) -> u64;

    /// Filter probes that passed but found nothing on disk.
    fn bloom_false_positive(&self) -> u64;

    /// `false` means definitely absent; `true` is only a hint.
    fn probably_in_store(&self, routing_key: &RoutingKey) -> bool;
}
