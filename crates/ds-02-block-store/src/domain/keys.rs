//! Routing keys.

use std::fmt;

use crate::domain::errors::VerifyError;

/// Length of every routing key handled by this store.
pub const ROUTING_KEY_LEN: usize = 32;

/// Fixed-length identifier a block is filed and looked up under.
///
/// Every kind derives its routing key from a SHA-256 digest, so the bytes are
/// uniformly distributed; lock striping relies on that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey([u8; ROUTING_KEY_LEN]);

impl RoutingKey {
    pub const LEN: usize = ROUTING_KEY_LEN;

    pub const fn new(bytes: [u8; ROUTING_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, VerifyError> {
        let array: [u8; ROUTING_KEY_LEN] =
            bytes.try_into().map_err(|_| VerifyError::InvalidLength {
                field: "routing key",
                expected: ROUTING_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; ROUTING_KEY_LEN] {
        &self.0
    }

    /// Stripe index in `0..stripes` for per-key lock striping.
    pub fn stripe(&self, stripes: usize) -> usize {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        (u64::from_le_bytes(prefix) % stripes.max(1) as u64) as usize
    }
}

impl AsRef<[u8]> for RoutingKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ROUTING_KEY_LEN]> for RoutingKey {
    fn from(bytes: [u8; ROUTING_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutingKey({}..)", hex::encode(&self.0[..6]))
    }
}
