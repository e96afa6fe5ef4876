//! # SHA-256 Hashing
//!
//! Every routing key in the store is a SHA-256 digest of something: the block
//! bytes for content-hash blocks, the verifying key for public-key records, or
//! the document name and key hash for signed-subspace blocks.

use sha2::{Digest, Sha256};

/// 256-bit digest.
pub type Digest32 = [u8; 32];

/// Incremental SHA-256 hasher for multi-part inputs.
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more input.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Digest32 {
        self.inner.finalize().into()
    }
}

/// One-shot SHA-256.
pub fn sha256(data: &[u8]) -> Digest32 {
    Sha256::digest(data).into()
}

/// SHA-256 over the concatenation of `parts`, without allocating the concatenation.
pub fn sha256_many(parts: &[&[u8]]) -> Digest32 {
    let mut hasher = Sha256Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}
