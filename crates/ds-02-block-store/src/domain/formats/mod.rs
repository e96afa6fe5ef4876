//! # Block Formats
//!
//! The three block kinds a store can hold, their fixed geometry, and the
//! validation each applies when a block is rebuilt from stored bytes.
//!
//! | Kind | Header | Payload | Full key | Collisions | Keeps full keys | Needs key |
//! |------|--------|---------|----------|------------|-----------------|-----------|
//! | content-hash | 36 | 32768 | 34 | no | yes | no |
//! | signed-subspace | 102 | 1024 | 66 | yes | yes | yes |
//! | public-key | 0 | 32 | 32 | no | no | no |

pub mod content_hash;
pub mod public_key;
pub mod signed_subspace;


use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::VerifyError;
use crate::domain::keys::RoutingKey;

pub use content_hash::{ContentHashBlock, ContentHashKey};
pub use public_key::PublicKeyRecord;
pub use signed_subspace::{SignedSubspaceBlock, SubspaceKey};

/// Hash algorithm identifier for SHA-256, shared by every kind.
pub const HASH_ALGORITHM_SHA256: u16 = 1;

/// Fixed geometry and policy of one block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub routing_key_len: usize,
    pub header_len: usize,
    pub payload_len: usize,
    pub full_key_len: usize,
    /// Two different valid blocks can share a routing key.
    pub collision_possible: bool,
    /// Full keys are persisted alongside the record.
    pub store_full_keys: bool,
    /// Construction requires caller-supplied key material.
    pub construct_needs_key: bool,
}

/// Kind of block a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    ContentHash,
    SignedSubspace,
    PublicKey,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [
        BlockKind::ContentHash,
        BlockKind::SignedSubspace,
        BlockKind::PublicKey,
    ];

    pub const fn spec(self) -> &'static FormatSpec {
        match self {
            BlockKind::ContentHash => &content_hash::FORMAT,
            BlockKind::SignedSubspace => &signed_subspace::FORMAT,
            BlockKind::PublicKey => &public_key::FORMAT,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BlockKind::ContentHash => "content-hash",
            BlockKind::SignedSubspace => "signed-subspace",
            BlockKind::PublicKey => "public-key",
        }
    }

    /// Default file stem for stores of this kind.
    pub const fn file_stem(self) -> &'static str {
        match self {
            BlockKind::ContentHash => "chk",
            BlockKind::SignedSubspace => "ssk",
            BlockKind::PublicKey => "pubkey",
        }
    }

    /// Routing key a full key of this kind addresses.
    pub fn routing_key_from_full_key(self, full_key: &[u8]) -> Result<RoutingKey, VerifyError> {
        match self {
            BlockKind::ContentHash => Ok(ContentHashKey::from_bytes(full_key)?.routing_key()),
            BlockKind::SignedSubspace => Ok(SubspaceKey::from_bytes(full_key)?.routing_key()),
            BlockKind::PublicKey => RoutingKey::from_slice(full_key),
        }
    }

    /// Rebuild and fully validate a block from its stored bytes.
    pub fn construct(
        self,
        payload: &[u8],
        header: &[u8],
        routing_key: &RoutingKey,
        ctx: &ConstructContext<'_>,
    ) -> Result<Block, VerifyError> {
        match self {
            BlockKind::ContentHash => {
                ContentHashBlock::construct_for(payload, header, routing_key)
                    .map(Block::ContentHash)
            }
            BlockKind::PublicKey => {
                PublicKeyRecord::construct(payload, header, routing_key).map(Block::PublicKey)
            }
            BlockKind::SignedSubspace => {
                let resolved;
                let verification_key = match ctx.verification_key {
                    Some(key) => key,
                    None => {
                        let full_key = ctx.full_key.ok_or(VerifyError::KeyRequired("full key"))?;
                        let key = SubspaceKey::from_bytes(full_key)
                            .map_err(|_| VerifyError::KeyMismatch("full key"))?;
                        resolved = ctx
                            .key_source
                            .and_then(|source| {
                                source.public_key(key.pubkey_hash(), ctx.can_read_client_cache)
                            })
                            .ok_or(VerifyError::KeyRequired("verification key"))?;
                        &resolved
                    }
                };
                SignedSubspaceBlock::construct(
                    payload,
                    header,
                    routing_key,
                    ctx.full_key,
                    verification_key,
                )
                .map(Block::SignedSubspace)
            }
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Looks up verification keys by their hash.
///
/// Implementations report unavailable keys as `None`; a lookup failure leaves
/// the block unconstructable for this fetch, never corrupt.
pub trait PublicKeySource: Send + Sync {
    fn public_key(
        &self,
        pubkey_hash: &RoutingKey,
        can_read_client_cache: bool,
    ) -> Option<PublicKeyRecord>;
}

/// Caller-supplied context for [`BlockKind::construct`].
#[derive(Clone, Copy, Default)]
pub struct ConstructContext<'a> {
    pub full_key: Option<&'a [u8]>,
    pub can_read_client_cache: bool,
    pub verification_key: Option<&'a PublicKeyRecord>,
    pub key_source: Option<&'a dyn PublicKeySource>,
}

impl<'a> ConstructContext<'a> {
    pub fn with_full_key(mut self, full_key: &'a [u8]) -> Self {
        self.full_key = Some(full_key);
        self
    }

    pub fn with_verification_key(mut self, key: &'a PublicKeyRecord) -> Self {
        self.verification_key = Some(key);
        self
    }

    pub fn with_key_source(mut self, source: &'a dyn PublicKeySource) -> Self {
        self.key_source = Some(source);
        self
    }

    pub fn with_client_cache(mut self, can_read: bool) -> Self {
        self.can_read_client_cache = can_read;
        self
    }
}

impl fmt::Debug for ConstructContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructContext")
            .field("full_key", &self.full_key.map(hex::encode))
            .field("can_read_client_cache", &self.can_read_client_cache)
            .field("verification_key", &self.verification_key)
            .field("key_source", &self.key_source.is_some())
            .finish()
    }
}

/// Anything the engine can file: a kind plus its raw parts.
pub trait StorableBlock {
    fn kind(&self) -> BlockKind;
    fn routing_key(&self) -> RoutingKey;
    fn header(&self) -> &[u8];
    fn payload(&self) -> &[u8];
    fn full_key(&self) -> Option<Vec<u8>>;
}

/// A validated block of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    ContentHash(ContentHashBlock),
    SignedSubspace(SignedSubspaceBlock),
    PublicKey(PublicKeyRecord),
}

impl Block {
    pub fn into_content_hash(self) -> Option<ContentHashBlock> {
        match self {
            Block::ContentHash(block) => Some(block),
            _ => None,
        }
    }

    pub fn into_signed_subspace(self) -> Option<SignedSubspaceBlock> {
        match self {
            Block::SignedSubspace(block) => Some(block),
            _ => None,
        }
    }

    pub fn into_public_key(self) -> Option<PublicKeyRecord> {
        match self {
            Block::PublicKey(record) => Some(record),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn StorableBlock {
        match self {
            Block::ContentHash(block) => block,
            Block::SignedSubspace(block) => block,
            Block::PublicKey(record) => record,
        }
    }
}

impl StorableBlock for Block {
    fn kind(&self) -> BlockKind {
        self.inner().kind()
    }

    fn routing_key(&self) -> RoutingKey {
        self.inner().routing_key()
    }

    fn header(&self) -> &[u8] {
        self.inner().header()
    }

    fn payload(&self) -> &[u8] {
        self.inner().payload()
    }

    fn full_key(&self) -> Option<Vec<u8>> {
        self.inner().full_key()
    }
}

/// Fail with `InvalidLength` unless `actual == expected`.
pub(crate) fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), VerifyError> {
    if expected != actual {
        return Err(VerifyError::InvalidLength {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}
