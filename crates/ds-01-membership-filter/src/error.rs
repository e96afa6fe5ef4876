//! Error types for the membership filter

use thiserror::Error;

/// Errors raised while sizing, loading or saving a filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {fpr} (must be in (0, 1))")]
    InvalidFpr { fpr: f64 },

    #[error("Invalid filter capacity: {capacity}")]
    InvalidCapacity { capacity: u64 },

    #[error("Filter size exceeds maximum: {size_bits} > {max_bits} bits")]
    FilterTooLarge { size_bits: u64, max_bits: u64 },

    #[error("Corrupt filter image: {0}")]
    Corrupt(String),

    #[error("Filter I/O error: {0}")]
    Io(#[from] std::io::Error),
}
