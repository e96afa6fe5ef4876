//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use shared_crypto::Ed25519KeyPair;

use crate::adapters::storage::InMemoryRecordStore;
use crate::domain::config::StoreConfig;
use crate::domain::entities::{RecordSummary, StoredRecord};
use crate::domain::errors::StoreIoError;
use crate::domain::formats::{ContentHashBlock, SignedSubspaceBlock};
use crate::domain::keys::RoutingKey;
use crate::ports::outbound::RecordStore;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn config(max_keys: u64) -> StoreConfig {
    StoreConfig::default()
        .with_max_keys(max_keys)
        .with_key_lock_stripes(16)
}

pub(crate) fn chk(n: u32) -> ContentHashBlock {
    ContentHashBlock::encode(format!("block-{n}").as_bytes()).unwrap()
}

pub(crate) fn keypair(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

pub(crate) fn ssk(seed: u8, document: &str, content: &str) -> SignedSubspaceBlock {
    SignedSubspaceBlock::sign(&keypair(seed), document.as_bytes(), content.as_bytes()).unwrap()
}

/// In-memory record store whose operations can be made to fail.
#[derive(Default)]
pub(crate) struct FaultyRecordStore {
    inner: InMemoryRecordStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_removes: AtomicBool,
}

impl FaultyRecordStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreIoError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreIoError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected {what} failure"),
            )));
        }
        Ok(())
    }
}

impl RecordStore for FaultyRecordStore {
    fn read(&self, key: &RoutingKey) -> Result<Option<StoredRecord>, StoreIoError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.read(key)
    }

    fn write(&self, record: &StoredRecord) -> Result<(), StoreIoError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.write(record)
    }

    fn remove(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        Self::check(&self.fail_removes, "remove")?;
        self.inner.remove(key)
    }

    fn contains(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.contains(key)
    }

    fn scan(&self) -> Result<Vec<RecordSummary>, StoreIoError> {
        self.inner.scan()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn flush(&self) -> Result<(), StoreIoError> {
        self.inner.flush()
    }
}
