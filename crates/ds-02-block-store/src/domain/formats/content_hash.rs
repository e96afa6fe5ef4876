//! # Content-Hash Blocks
//!
//! Immutable blocks addressed by the SHA-256 of their header and payload.
//!
//! Header layout (36 bytes, big-endian):
//!
//! ```text
//! [hash_algorithm: u16][content_len: u16][payload_digest: 32]
//! ```
//!
//! The payload is the content zero-padded to 32 KiB. Two valid blocks can
//! never share a routing key, so re-storing one is always a no-op.

use std::fmt;

use shared_crypto::{sha256, sha256_many};

use super::{check_len, read_u16, BlockKind, FormatSpec, StorableBlock, HASH_ALGORITHM_SHA256};
use crate::domain::errors::VerifyError;
use crate::domain::keys::RoutingKey;

pub const HEADER_LEN: usize = 36;
pub const PAYLOAD_LEN: usize = 32 * 1024;
pub const FULL_KEY_LEN: usize = 34;
pub const KEY_TYPE: u8 = 1;

pub(super) const FORMAT: FormatSpec = FormatSpec {
    routing_key_len: RoutingKey::LEN,
    header_len: HEADER_LEN,
    payload_len: PAYLOAD_LEN,
    full_key_len: FULL_KEY_LEN,
    collision_possible: false,
    store_full_keys: true,
    construct_needs_key: false,
};

/// Full key of a content-hash block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHashKey {
    routing_key: RoutingKey,
}

impl ContentHashKey {
    pub fn new(routing_key: RoutingKey) -> Self {
        Self { routing_key }
    }

    pub fn routing_key(&self) -> RoutingKey {
        self.routing_key
    }

    /// `[key_type][hash_algorithm][routing_key]`
    pub fn to_bytes(&self) -> [u8; FULL_KEY_LEN] {
        let mut out = [0u8; FULL_KEY_LEN];
        out[0] = KEY_TYPE;
        out[1] = HASH_ALGORITHM_SHA256 as u8;
        out[2..].copy_from_slice(self.routing_key.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        check_len("content-hash full key", FULL_KEY_LEN, bytes.len())?;
        if bytes[0] != KEY_TYPE {
            return Err(VerifyError::UnsupportedKeyType(bytes[0]));
        }
        if u16::from(bytes[1]) != HASH_ALGORITHM_SHA256 {
            return Err(VerifyError::UnsupportedAlgorithm {
                field: "hash algorithm",
                value: u16::from(bytes[1]),
            });
        }
        Ok(Self {
            routing_key: RoutingKey::from_slice(&bytes[2..])?,
        })
    }
}

/// A validated content-hash block.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentHashBlock {
    routing_key: RoutingKey,
    header: [u8; HEADER_LEN],
    payload: Box<[u8]>,
}

impl ContentHashBlock {
    /// Wrap `content` (at most 32 KiB) into a block.
    pub fn encode(content: &[u8]) -> Result<Self, VerifyError> {
        if content.len() > PAYLOAD_LEN {
            return Err(VerifyError::ContentTooLong {
                declared: content.len(),
                capacity: PAYLOAD_LEN,
            });
        }
        let mut payload = vec![0u8; PAYLOAD_LEN].into_boxed_slice();
        payload[..content.len()].copy_from_slice(content);

        let mut header = [0u8; HEADER_LEN];
        header[0..2].copy_from_slice(&HASH_ALGORITHM_SHA256.to_be_bytes());
        header[2..4].copy_from_slice(&(content.len() as u16).to_be_bytes());
        header[4..].copy_from_slice(&sha256(&payload));

        let routing_key = RoutingKey::new(sha256_many(&[&header[..], &payload[..]]));
        Ok(Self {
            routing_key,
            header,
            payload,
        })
    }

    /// Validate raw bytes and derive the routing key they hash to.
    pub fn construct(payload: &[u8], header: &[u8]) -> Result<Self, VerifyError> {
        check_len("content-hash header", HEADER_LEN, header.len())?;
        check_len("content-hash payload", PAYLOAD_LEN, payload.len())?;

        let algorithm = read_u16(header, 0);
        if algorithm != HASH_ALGORITHM_SHA256 {
            return Err(VerifyError::UnsupportedAlgorithm {
                field: "hash algorithm",
                value: algorithm,
            });
        }
        let declared = usize::from(read_u16(header, 2));
        if declared > PAYLOAD_LEN {
            return Err(VerifyError::ContentTooLong {
                declared,
                capacity: PAYLOAD_LEN,
            });
        }
        if sha256(payload)[..] != header[4..] {
            return Err(VerifyError::DigestMismatch);
        }

        let mut header_bytes = [0u8; HEADER_LEN];
        header_bytes.copy_from_slice(header);
        Ok(Self {
            routing_key: RoutingKey::new(sha256_many(&[header, payload])),
            header: header_bytes,
            payload: payload.into(),
        })
    }

    /// Validate raw bytes filed under `routing_key`.
    pub fn construct_for(
        payload: &[u8],
        header: &[u8],
        routing_key: &RoutingKey,
    ) -> Result<Self, VerifyError> {
        let block = Self::construct(payload, header)?;
        if block.routing_key != *routing_key {
            return Err(VerifyError::RoutingKeyMismatch {
                expected: *routing_key,
                computed: block.routing_key,
            });
        }
        Ok(block)
    }

    /// The content without padding.
    pub fn content(&self) -> &[u8] {
        let len = usize::from(read_u16(&self.header, 2));
        &self.payload[..len]
    }

    pub fn key(&self) -> ContentHashKey {
        ContentHashKey::new(self.routing_key)
    }
}

impl StorableBlock for ContentHashBlock {
    fn kind(&self) -> BlockKind {
        BlockKind::ContentHash
    }

    fn routing_key(&self) -> RoutingKey {
        self.routing_key
    }

    fn header(&self) -> &[u8] {
        &self.header
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn full_key(&self) -> Option<Vec<u8>> {
        Some(self.key().to_bytes().to_vec())
    }
}

impl fmt::Debug for ContentHashBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHashBlock")
            .field("routing_key", &self.routing_key)
            .field("content_len", &self.content().len())
            .finish()
    }
}
