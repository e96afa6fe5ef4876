//! # DS-01 Membership Filter
//!
//! Answers "is this routing key probably in the store?" without touching disk.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure data structure, no locking, no I/O
//!   - `BloomFilter`: bit array + double-hashed probe positions
//!   - `FilterParams`: optimal `m`/`k` for a capacity and target FPR
//!   - `FilterConfig`: validated sizing configuration
//!
//! - **Service Layer** (`service/`): what the block store actually holds
//!   - `MembershipFilter`: thread-safe wrapper with observed false-positive
//!     accounting, rebuild and persistence
//!
//! ## Contract
//!
//! The filter is **probabilistic-positive, deterministic-negative**:
//!
//! - `might_contain(k) == false` guarantees `k` was never inserted since the
//!   last rebuild.
//! - `might_contain(k) == true` only means "worth a disk lookup".
//!
//! Keys are never removed. Evicted or overwritten entries stay set until the
//! owner rebuilds the filter from its live key set; until then they are
//! counted as stale and show up as false positives.
//!
//! ## Usage Example
//!
//! ```ignore
//! use ds_01_membership_filter::{FilterConfig, MembershipFilter};
//!
//! let filter = MembershipFilter::new(FilterConfig::for_capacity(1_000_000))?;
//! filter.insert(&routing_key);
//! assert!(filter.might_contain(&routing_key));
//! ```

pub mod domain;
pub mod error;
pub mod service;

pub use domain::{BloomFilter, FilterConfig, FilterConfigBuilder, FilterParams};
pub use error::FilterError;
pub use service::{FilterStats, MembershipFilter};
