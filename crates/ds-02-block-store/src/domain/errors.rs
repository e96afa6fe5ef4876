//! # Domain Errors
//!
//! Error types for the block store.
//!
//! Validation failures (`VerifyError`) split into two families: corruption,
//! where the stored bytes are no longer a valid block and the engine removes
//! the entry, and missing or mismatched caller context, where the entry is
//! kept and the fetch is reported as a miss.

use std::io;
use std::path::PathBuf;

use ds_01_membership_filter::FilterError;
use thiserror::Error;

use crate::domain::formats::BlockKind;
use crate::domain::keys::RoutingKey;

/// Why a block failed to construct from its stored or supplied bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("Invalid {field} length: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported {field}: {value}")]
    UnsupportedAlgorithm { field: &'static str, value: u16 },

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(u8),

    #[error("Declared content length {declared} exceeds payload size {capacity}")]
    ContentTooLong { declared: usize, capacity: usize },

    #[error("Payload digest does not match header")]
    DigestMismatch,

    #[error("Routing key mismatch: expected {expected}, computed {computed}")]
    RoutingKeyMismatch {
        expected: RoutingKey,
        computed: RoutingKey,
    },

    #[error("Header document name does not match the stored key")]
    DocumentNameMismatch,

    #[error("Invalid verification key")]
    InvalidPublicKey,

    #[error("Signature verification failed")]
    BadSignature,

    /// Construction needs context the caller did not provide.
    #[error("Construction requires {0}")]
    KeyRequired(&'static str),

    /// Caller-supplied context is inconsistent with the entry.
    #[error("Supplied {0} does not match the block")]
    KeyMismatch(&'static str),
}

impl VerifyError {
    /// True when the stored bytes themselves are invalid.
    ///
    /// `KeyRequired` and `KeyMismatch` describe the caller's context, not the
    /// entry, so they never cause removal.
    pub fn is_corruption(&self) -> bool {
        !matches!(
            self,
            VerifyError::KeyRequired(_) | VerifyError::KeyMismatch(_)
        )
    }
}

/// Failures reported by a record store.
#[derive(Debug, Error)]
pub enum StoreIoError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A slot exists for the key but its bytes fail the integrity check.
    #[error("Corrupt record for {key}: {reason}")]
    CorruptRecord { key: RoutingKey, reason: String },

    /// The files on disk were written with a different geometry.
    #[error("Store file {path} does not match the expected layout: {reason}")]
    LayoutMismatch { path: PathBuf, reason: String },

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Directory lock failures.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Store {path} is locked by another process")]
    AlreadyLocked { path: PathBuf },

    #[error("Failed to create lock file {path}: {source}")]
    CreateFailed { path: PathBuf, source: io::Error },
}

/// Errors surfaced by the store engine and the typed facades.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Block is invalid: {0}")]
    Verify(#[from] VerifyError),

    /// A different block is already filed under this routing key.
    #[error("Key collision on {key}")]
    KeyCollision { key: RoutingKey },

    #[error(transparent)]
    Io(#[from] StoreIoError),

    #[error("Invalid capacity: {requested}")]
    Capacity { requested: i64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Block kind mismatch: store holds {expected}, got {actual}")]
    KindMismatch {
        expected: BlockKind,
        actual: BlockKind,
    },

    #[error("Membership filter error: {0}")]
    Filter(#[from] FilterError),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(StoreIoError::Io(err))
    }
}

impl From<LockError> for StoreError {
    fn from(err: LockError) -> Self {
        StoreError::Io(StoreIoError::Lock(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_errors_are_not_corruption() {
        assert!(!VerifyError::KeyRequired("verification key").is_corruption());
        assert!(!VerifyError::KeyMismatch("full key").is_corruption());
    }

    #[test]
    fn test_content_errors_are_corruption() {
        let errors = [
            VerifyError::DigestMismatch,
            VerifyError::BadSignature,
            VerifyError::DocumentNameMismatch,
            VerifyError::InvalidPublicKey,
            VerifyError::UnsupportedKeyType(9),
            VerifyError::InvalidLength {
                field: "header",
                expected: 36,
                actual: 35,
            },
        ];
        for err in errors {
            assert!(err.is_corruption(), "{err} should be corruption");
        }
    }

    #[test]
    fn test_io_error_converts_to_store_error() {
        let err: StoreError = io::Error::new(io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, StoreError::Io(StoreIoError::Io(_))));
        assert!(err.to_string().contains("disk gone"));
    }
}
