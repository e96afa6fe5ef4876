//! # Public-Key Records
//!
//! Ed25519 verifying keys filed under their SHA-256, so signed-subspace
//! fetches can resolve a key from its hash alone. No header; the payload is
//! the 32-byte encoded key.

use shared_crypto::Ed25519PublicKey;

use super::{check_len, BlockKind, FormatSpec, StorableBlock};
use crate::domain::errors::VerifyError;
use crate::domain::keys::RoutingKey;

pub const HEADER_LEN: usize = 0;
pub const PAYLOAD_LEN: usize = Ed25519PublicKey::LEN;
pub const FULL_KEY_LEN: usize = RoutingKey::LEN;

pub(super) const FORMAT: FormatSpec = FormatSpec {
    routing_key_len: RoutingKey::LEN,
    header_len: HEADER_LEN,
    payload_len: PAYLOAD_LEN,
    full_key_len: FULL_KEY_LEN,
    collision_possible: false,
    store_full_keys: false,
    construct_needs_key: false,
};

/// A verifying key together with its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyRecord {
    hash: RoutingKey,
    key: Ed25519PublicKey,
}

impl PublicKeyRecord {
    pub fn new(key: Ed25519PublicKey) -> Self {
        Self {
            hash: RoutingKey::new(key.hash()),
            key,
        }
    }

    /// Validate a stored payload filed under `routing_key`.
    pub fn construct(
        payload: &[u8],
        header: &[u8],
        routing_key: &RoutingKey,
    ) -> Result<Self, VerifyError> {
        check_len("public-key header", HEADER_LEN, header.len())?;
        check_len("public-key payload", PAYLOAD_LEN, payload.len())?;
        let key = Ed25519PublicKey::from_slice(payload).map_err(|_| VerifyError::InvalidPublicKey)?;
        let record = Self::new(key);
        if record.hash != *routing_key {
            return Err(VerifyError::RoutingKeyMismatch {
                expected: *routing_key,
                computed: record.hash,
            });
        }
        Ok(record)
    }

    pub fn key(&self) -> &Ed25519PublicKey {
        &self.key
    }

    pub fn hash(&self) -> &RoutingKey {
        &self.hash
    }
}

impl StorableBlock for PublicKeyRecord {
    fn kind(&self) -> BlockKind {
        BlockKind::PublicKey
    }

    fn routing_key(&self) -> RoutingKey {
        self.hash
    }

    fn header(&self) -> &[u8] {
        &[]
    }

    fn payload(&self) -> &[u8] {
        self.key.as_bytes()
    }

    fn full_key(&self) -> Option<Vec<u8>> {
        Some(self.hash.as_bytes().to_vec())
    }
}
