//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Input slice had the wrong length for the key or signature type
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Bytes do not encode a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature did not verify against the message
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}
