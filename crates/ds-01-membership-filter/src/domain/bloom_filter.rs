//! Core Bloom filter
//!
//! INVARIANT: no false negatives. Once `insert(k)` returns, `contains(k)` is
//! true until `clear()`.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::HashPositions;
use super::parameters::{estimate_fpr, FilterParams};
use crate::error::FilterError;

/// Insert-only Bloom filter over routing keys.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u64, Lsb0>,
    /// Number of hash functions (k)
    k: usize,
    /// Size in bits (m)
    m: usize,
    /// Insertions since creation or last clear (n); duplicates included
    n: u64,
    /// Number of keys the filter was sized for
    capacity: u64,
    /// Per-instance hash salt
    salt: u32,
}

/// Serde support for BitVec
mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u64, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (bits.as_raw_slice(), bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u64, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (words, len): (Vec<u64>, usize) = Deserialize::deserialize(deserializer)?;
        if len > words.len() * 64 {
            return Err(serde::de::Error::custom("bit length exceeds stored words"));
        }
        let mut bits = BitVec::<u64, Lsb0>::from_vec(words);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create a filter from explicit parameters.
    pub fn with_params(params: FilterParams, salt: u32) -> Self {
        let m = params.size_bits.max(1);
        Self {
            bits: bitvec![u64, Lsb0; 0; m],
            k: params.hash_count.max(1),
            m,
            n: 0,
            capacity: params.capacity,
            salt,
        }
    }

    /// Create a filter sized for `capacity` keys at `target_fpr`.
    pub fn with_capacity(capacity: u64, target_fpr: f64, salt: u32) -> Self {
        Self::with_params(FilterParams::for_capacity(capacity, target_fpr), salt)
    }

    /// Insert a key. Returns `true` if at least one bit flipped, i.e. the key
    /// was definitely not present before.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let mut changed = false;
        for pos in HashPositions::new(key, self.k, self.m, self.salt) {
            if !self.bits[pos] {
                self.bits.set(pos, true);
                changed = true;
            }
        }
        self.n += 1;
        changed
    }

    /// `false` means definitely absent; `true` means possibly present.
    pub fn contains(&self, key: &[u8]) -> bool {
        HashPositions::new(key, self.k, self.m, self.salt).all(|pos| self.bits[pos])
    }

    /// FPR estimated from the current load.
    pub fn estimated_fpr(&self) -> f64 {
        estimate_fpr(self.m, self.n, self.k)
    }

    /// Number of bits set.
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Filter size in bits.
    pub fn size_bits(&self) -> usize {
        self.m
    }

    /// Number of hash functions.
    pub fn hash_count(&self) -> usize {
        self.k
    }

    /// Insertions since creation (duplicates counted).
    pub fn elements_inserted(&self) -> u64 {
        self.n
    }

    /// Number of keys this filter was sized for.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Hash salt.
    pub fn salt(&self) -> u32 {
        self.salt
    }

    /// Reset all bits.
    pub fn clear(&mut self) {
        self.bits.fill(false);
        self.n = 0;
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        bincode::serialize(self).map_err(|e| FilterError::Corrupt(e.to_string()))
    }

    /// Decode and sanity-check a bincode image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        let filter: Self =
            bincode::deserialize(bytes).map_err(|e| FilterError::Corrupt(e.to_string()))?;
        if filter.m == 0 || filter.bits.len() != filter.m || filter.k == 0 {
            return Err(FilterError::Corrupt(format!(
                "inconsistent geometry: m={}, bits={}, k={}",
                filter.m,
                filter.bits.len(),
                filter.k
            )));
        }
        Ok(filter)
    }
}
