//! Probe position generation
//!
//! One MurmurHash3 x64-128 call per key, split into two 64-bit halves and
//! combined with enhanced double hashing (Kirsch–Mitzenmacher):
//! `g_i = h1 + i*h2 + (i^3 - i)/6  (mod m)`.
//!
//! The salt ("tweak") is chosen per filter instance so that an adversary who
//! knows the algorithm cannot mint routing keys that all land on the same bits.

use std::io::Cursor;

/// Hash `element` with MurmurHash3 x64-128 under `salt`.
pub fn murmur_hash128(element: &[u8], salt: u32) -> u128 {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_x64_128(&mut cursor, salt).unwrap_or(0)
}

/// Iterator over the `k` bit positions probed for one element.
#[derive(Clone, Debug)]
pub struct HashPositions {
    h1: u64,
    h2: u64,
    m: u64,
    i: u64,
    k: u64,
}

impl HashPositions {
    /// Positions for `element` in a filter of `m` bits with `k` hash functions.
    pub fn new(element: &[u8], k: usize, m: usize, salt: u32) -> Self {
        let hash = murmur_hash128(element, salt);
        Self {
            h1: hash as u64,
            // Force h2 odd so successive probes never collapse onto h1 when m is even.
            h2: ((hash >> 64) as u64) | 1,
            m: m.max(1) as u64,
            i: 0,
            k: k as u64,
        }
    }
}

impl Iterator for HashPositions {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i >= self.k {
            return None;
        }
        let i = self.i;
        let cubic = (i.wrapping_mul(i).wrapping_mul(i)).wrapping_sub(i) / 6;
        let hash = self
            .h1
            .wrapping_add(i.wrapping_mul(self.h2))
            .wrapping_add(cubic);
        self.i += 1;
        Some((hash % self.m) as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.k - self.i) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HashPositions {}
