use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::entities::{RecordSummary, StoredRecord};
use crate::domain::errors::StoreIoError;
use crate::domain::keys::RoutingKey;
use crate::ports::outbound::RecordStore;

/// In-memory record store for tests and ephemeral stores.
///
/// Nothing survives a drop.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RoutingKey, StoredRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn read(&self, key: &RoutingKey) -> Result<Option<StoredRecord>, StoreIoError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn write(&self, record: &StoredRecord) -> Result<(), StoreIoError> {
        self.records
            .write()
            .insert(record.routing_key, record.clone());
        Ok(())
    }

    fn remove(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        Ok(self.records.write().remove(key).is_some())
    }

    fn contains(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        Ok(self.records.read().contains_key(key))
    }

    fn scan(&self) -> Result<Vec<RecordSummary>, StoreIoError> {
        Ok(self
            .records
            .read()
            .values()
            .map(|record| RecordSummary {
                routing_key: record.routing_key,
                generation: record.generation,
            })
            .collect())
    }

    fn len(&self) -> u64 {
        self.records.read().len() as u64
    }

    fn flush(&self) -> Result<(), StoreIoError> {
        Ok(())
    }
}
