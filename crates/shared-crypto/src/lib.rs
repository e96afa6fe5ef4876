//! # Shared Crypto
//!
//! The cryptographic primitives the block store treats as provided functions.
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Routing keys, payload digests, key hashes |
//! | `signatures` | Ed25519 | Signed-subspace block authentication |
//!
//! The store never decides *what* is signed or hashed here; block formats own
//! the byte layouts and call into this crate for the math.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

pub use errors::CryptoError;
pub use hashing::{sha256, sha256_many, Digest32, Sha256Hasher};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
