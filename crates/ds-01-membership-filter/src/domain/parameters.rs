//! Optimal Bloom filter sizing
//!
//! For `n` expected keys and target false-positive rate `p`:
//! - m = -n*ln(p) / (ln 2)^2      -- bits
//! - k = (m/n) * ln 2             -- hash functions
//! - FPR(m, n, k) = (1 - e^(-kn/m))^k

use std::f64::consts::LN_2;

/// Maximum number of hash functions; beyond this the probe cost dominates.
pub const MAX_HASH_COUNT: usize = 24;

/// Sizing parameters for one filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    /// Number of bits (m)
    pub size_bits: usize,
    /// Number of hash functions (k)
    pub hash_count: usize,
    /// Expected FPR once `capacity` keys are inserted
    pub expected_fpr: f64,
    /// Number of keys the filter was sized for (n)
    pub capacity: u64,
}

impl FilterParams {
    /// Optimal parameters for `capacity` keys at `target_fpr`.
    pub fn for_capacity(capacity: u64, target_fpr: f64) -> Self {
        let n = capacity.max(1) as f64;
        let size_bits = (-n * target_fpr.ln() / (LN_2 * LN_2)).ceil().max(8.0) as usize;
        let hash_count = ((size_bits as f64 / n) * LN_2)
            .round()
            .clamp(1.0, MAX_HASH_COUNT as f64) as usize;

        Self {
            size_bits,
            hash_count,
            expected_fpr: estimate_fpr(size_bits, capacity, hash_count),
            capacity,
        }
    }
}

/// Estimated FPR after `n` insertions into `m` bits with `k` hashes.
pub fn estimate_fpr(m: usize, n: u64, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
