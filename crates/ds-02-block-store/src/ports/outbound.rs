//! # Outbound Ports (Driven Ports)
//!
//! Persistence required by the store engine.
//!
//! Production: [`FileRecordStore`](crate::adapters::storage::FileRecordStore)
//! Testing: [`InMemoryRecordStore`](crate::adapters::storage::InMemoryRecordStore)

use crate::domain::entities::{RecordSummary, StoredRecord};
use crate::domain::errors::StoreIoError;
use crate::domain::keys::RoutingKey;

/// Keyed record persistence.
///
/// The engine serializes all calls for a given routing key; implementations
/// only need to be safe for concurrent calls on distinct keys.
pub trait RecordStore: Send + Sync {
    /// Read the record under `key`.
    ///
    /// A record that exists but fails its integrity check is reported as
    /// `StoreIoError::CorruptRecord`, so the engine can remove it.
    fn read(&self, key: &RoutingKey) -> Result<Option<StoredRecord>, StoreIoError>;

    /// Insert or replace the record under `record.routing_key`.
    fn write(&self, record: &StoredRecord) -> Result<(), StoreIoError>;

    /// Remove the record under `key`; `false` if there was none.
    fn remove(&self, key: &RoutingKey) -> Result<bool, StoreIoError>;

    fn contains(&self, key: &RoutingKey) -> Result<bool, StoreIoError>;

    /// Every live record's key and write generation, in no particular order.
    fn scan(&self) -> Result<Vec<RecordSummary>, StoreIoError>;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make all completed writes durable.
    fn flush(&self) -> Result<(), StoreIoError>;
}
