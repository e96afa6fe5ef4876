//! # Signed-Subspace Blocks
//!
//! Mutable-namespace blocks: the owner of an Ed25519 key can publish one block
//! per document name. The routing key depends only on the document name and
//! the key hash, so different signed contents can collide.
//!
//! Header layout (102 bytes, big-endian):
//!
//! ```text
//! [hash_algorithm: u16][signature_algorithm: u16][content_len: u16]
//! [docname_hash: 32][signature: 64]
//! ```
//!
//! The signature covers `header[0..38] || SHA-256(payload)`.

use std::fmt;

use shared_crypto::{sha256, sha256_many, Ed25519KeyPair, Ed25519Signature};

use super::{
    check_len, read_u16, BlockKind, FormatSpec, PublicKeyRecord, StorableBlock,
    HASH_ALGORITHM_SHA256,
};
use crate::domain::errors::VerifyError;
use crate::domain::keys::RoutingKey;

pub const HEADER_LEN: usize = 102;
pub const PAYLOAD_LEN: usize = 1024;
pub const FULL_KEY_LEN: usize = 66;
pub const KEY_TYPE: u8 = 2;
pub const SIGNATURE_ALGORITHM_ED25519: u16 = 1;

/// Header prefix covered by the signature.
const SIGNED_PREFIX_LEN: usize = 38;
const DOCNAME_RANGE: std::ops::Range<usize> = 6..38;

pub(super) const FORMAT: FormatSpec = FormatSpec {
    routing_key_len: RoutingKey::LEN,
    header_len: HEADER_LEN,
    payload_len: PAYLOAD_LEN,
    full_key_len: FULL_KEY_LEN,
    collision_possible: true,
    store_full_keys: true,
    construct_needs_key: true,
};

/// Full key of a signed-subspace block.
///
/// May carry the verification key itself, which lets a fetch skip the
/// public-key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubspaceKey {
    pubkey_hash: RoutingKey,
    docname_hash: [u8; 32],
    pubkey: Option<PublicKeyRecord>,
}

impl SubspaceKey {
    pub fn new(pubkey_hash: RoutingKey, docname_hash: [u8; 32]) -> Self {
        Self {
            pubkey_hash,
            docname_hash,
            pubkey: None,
        }
    }

    /// Key for `document_name` in the subspace owned by `pubkey`.
    pub fn for_document(pubkey: PublicKeyRecord, document_name: &[u8]) -> Self {
        Self {
            pubkey_hash: *pubkey.hash(),
            docname_hash: sha256(document_name),
            pubkey: Some(pubkey),
        }
    }

    /// Attach the verification key; ignored unless its hash matches.
    pub fn with_public_key(mut self, pubkey: PublicKeyRecord) -> Self {
        if *pubkey.hash() == self.pubkey_hash {
            self.pubkey = Some(pubkey);
        }
        self
    }

    pub fn routing_key(&self) -> RoutingKey {
        RoutingKey::new(sha256_many(&[&self.docname_hash[..], &self.pubkey_hash.as_bytes()[..]]))
    }

    pub fn pubkey_hash(&self) -> &RoutingKey {
        &self.pubkey_hash
    }

    pub fn docname_hash(&self) -> &[u8; 32] {
        &self.docname_hash
    }

    pub fn public_key(&self) -> Option<&PublicKeyRecord> {
        self.pubkey.as_ref()
    }

    /// `[key_type][hash_algorithm][pubkey_hash][docname_hash]`
    pub fn to_bytes(&self) -> [u8; FULL_KEY_LEN] {
        let mut out = [0u8; FULL_KEY_LEN];
        out[0] = KEY_TYPE;
        out[1] = HASH_ALGORITHM_SHA256 as u8;
        out[2..34].copy_from_slice(self.pubkey_hash.as_bytes());
        out[34..].copy_from_slice(&self.docname_hash);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        check_len("signed-subspace full key", FULL_KEY_LEN, bytes.len())?;
        if bytes[0] != KEY_TYPE {
            return Err(VerifyError::UnsupportedKeyType(bytes[0]));
        }
        if u16::from(bytes[1]) != HASH_ALGORITHM_SHA256 {
            return Err(VerifyError::UnsupportedAlgorithm {
                field: "hash algorithm",
                value: u16::from(bytes[1]),
            });
        }
        let mut docname_hash = [0u8; 32];
        docname_hash.copy_from_slice(&bytes[34..]);
        Ok(Self::new(RoutingKey::from_slice(&bytes[2..34])?, docname_hash))
    }
}

/// A validated signed-subspace block.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedSubspaceBlock {
    key: SubspaceKey,
    pubkey: PublicKeyRecord,
    header: [u8; HEADER_LEN],
    payload: Box<[u8]>,
}

impl SignedSubspaceBlock {
    /// Sign `content` (at most 1 KiB) as `document_name` under `keypair`.
    pub fn sign(
        keypair: &Ed25519KeyPair,
        document_name: &[u8],
        content: &[u8],
    ) -> Result<Self, VerifyError> {
        if content.len() > PAYLOAD_LEN {
            return Err(VerifyError::ContentTooLong {
                declared: content.len(),
                capacity: PAYLOAD_LEN,
            });
        }
        let pubkey = PublicKeyRecord::new(keypair.public_key());
        let key = SubspaceKey::for_document(pubkey, document_name);

        let mut payload = vec![0u8; PAYLOAD_LEN].into_boxed_slice();
        payload[..content.len()].copy_from_slice(content);

        let mut header = [0u8; HEADER_LEN];
        header[0..2].copy_from_slice(&HASH_ALGORITHM_SHA256.to_be_bytes());
        header[2..4].copy_from_slice(&SIGNATURE_ALGORITHM_ED25519.to_be_bytes());
        header[4..6].copy_from_slice(&(content.len() as u16).to_be_bytes());
        header[DOCNAME_RANGE].copy_from_slice(key.docname_hash());

        let signature = keypair.sign(&signed_message(&header, &payload));
        header[SIGNED_PREFIX_LEN..].copy_from_slice(signature.as_bytes());

        Ok(Self {
            key,
            pubkey,
            header,
            payload,
        })
    }

    /// Validate raw bytes filed under `routing_key` against `pubkey`.
    ///
    /// `full_key`, when given, must already address `routing_key`. A verification
    /// key that disagrees with it is a caller error; a header that disagrees
    /// with it is corruption.
    pub fn construct(
        payload: &[u8],
        header: &[u8],
        routing_key: &RoutingKey,
        full_key: Option<&[u8]>,
        pubkey: &PublicKeyRecord,
    ) -> Result<Self, VerifyError> {
        check_len("signed-subspace header", HEADER_LEN, header.len())?;
        check_len("signed-subspace payload", PAYLOAD_LEN, payload.len())?;

        let hash_algorithm = read_u16(header, 0);
        if hash_algorithm != HASH_ALGORITHM_SHA256 {
            return Err(VerifyError::UnsupportedAlgorithm {
                field: "hash algorithm",
                value: hash_algorithm,
            });
        }
        let signature_algorithm = read_u16(header, 2);
        if signature_algorithm != SIGNATURE_ALGORITHM_ED25519 {
            return Err(VerifyError::UnsupportedAlgorithm {
                field: "signature algorithm",
                value: signature_algorithm,
            });
        }
        let declared = usize::from(read_u16(header, 4));
        if declared > PAYLOAD_LEN {
            return Err(VerifyError::ContentTooLong {
                declared,
                capacity: PAYLOAD_LEN,
            });
        }

        let mut docname_hash = [0u8; 32];
        docname_hash.copy_from_slice(&header[DOCNAME_RANGE]);

        if let Some(full_key) = full_key {
            let expected =
                SubspaceKey::from_bytes(full_key).map_err(|_| VerifyError::KeyMismatch("full key"))?;
            if expected.pubkey_hash != *pubkey.hash() {
                return Err(VerifyError::KeyMismatch("verification key"));
            }
            if expected.docname_hash != docname_hash {
                return Err(VerifyError::DocumentNameMismatch);
            }
        }

        let key = SubspaceKey::new(*pubkey.hash(), docname_hash).with_public_key(*pubkey);
        let computed = key.routing_key();
        if computed != *routing_key {
            // Without a full key this may be a wrong verification key, not damage.
            if full_key.is_none() {
                return Err(VerifyError::KeyMismatch("verification key"));
            }
            return Err(VerifyError::RoutingKeyMismatch {
                expected: *routing_key,
                computed,
            });
        }

        let signature = Ed25519Signature::from_slice(&header[SIGNED_PREFIX_LEN..])
            .map_err(|_| VerifyError::BadSignature)?;
        pubkey
            .key()
            .verify(&signed_message(header, payload), &signature)
            .map_err(|_| VerifyError::BadSignature)?;

        let mut header_bytes = [0u8; HEADER_LEN];
        header_bytes.copy_from_slice(header);
        Ok(Self {
            key,
            pubkey: *pubkey,
            header: header_bytes,
            payload: payload.into(),
        })
    }

    /// The content without padding.
    pub fn content(&self) -> &[u8] {
        let len = usize::from(read_u16(&self.header, 4));
        &self.payload[..len]
    }

    pub fn key(&self) -> &SubspaceKey {
        &self.key
    }

    /// The key that signed this block.
    pub fn public_key(&self) -> &PublicKeyRecord {
        &self.pubkey
    }
}

fn signed_message(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(SIGNED_PREFIX_LEN + 32);
    message.extend_from_slice(&header[..SIGNED_PREFIX_LEN]);
    message.extend_from_slice(&sha256(payload));
    message
}

impl StorableBlock for SignedSubspaceBlock {
    fn kind(&self) -> BlockKind {
        BlockKind::SignedSubspace
    }

    fn routing_key(&self) -> RoutingKey {
        self.key.routing_key()
    }

    fn header(&self) -> &[u8] {
        &self.header
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn full_key(&self) -> Option<Vec<u8>> {
        Some(self.key.to_bytes().to_vec())
    }
}

impl fmt::Debug for SignedSubspaceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedSubspaceBlock")
            .field("routing_key", &self.key.routing_key())
            .field("content_len", &self.content().len())
            .finish()
    }
}
