//! # Recency Index
//!
//! Least-recently-used order over the routing keys of a store. The head is
//! the most recently written or promoted key; eviction pops from the tail.
//!
//! The index is unbounded: capacity is enforced by the engine, which needs to
//! remove each victim from the record store before it is gone for good.


use lru::LruCache;

use crate::domain::keys::RoutingKey;

/// LRU order over live routing keys.
pub struct RecencyIndex {
    order: LruCache<RoutingKey, ()>,
}

impl RecencyIndex {
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    /// Seed from `(key, generation)` pairs; higher generations end up more recent.
    pub fn from_generations(mut entries: Vec<(RoutingKey, u64)>) -> Self {
        entries.sort_by_key(|(_, generation)| *generation);
        let mut index = Self::new();
        for (key, _) in entries {
            index.insert(key);
        }
        index
    }

    /// Make `key` the most recent, inserting it if absent.
    ///
    /// Returns `true` if the key was not present before.
    pub fn insert(&mut self, key: RoutingKey) -> bool {
        self.order.put(key, ()).is_none()
    }

    /// Move an existing key to the head. Absent keys are left absent.
    pub fn promote(&mut self, key: &RoutingKey) -> bool {
        self.order.get(key).is_some()
    }

    pub fn pop_least_recent(&mut self) -> Option<RoutingKey> {
        self.order.pop_lru().map(|(key, _)| key)
    }

    pub fn peek_least_recent(&self) -> Option<&RoutingKey> {
        self.order.peek_lru().map(|(key, _)| key)
    }

    pub fn remove(&mut self, key: &RoutingKey) -> bool {
        self.order.pop(key).is_some()
    }

    /// Membership test that does not touch the order.
    pub fn contains(&self, key: &RoutingKey) -> bool {
        self.order.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys from most to least recent.
    pub fn keys(&self) -> impl Iterator<Item = &RoutingKey> + '_ {
        self.order.iter().map(|(key, _)| key)
    }
}

impl Default for RecencyIndex {
    fn default() -> Self {
        Self::new()
    }
}
