//! # Domain Layer
//!
//! Block-store logic with no I/O: key types, block formats, the recency
//! order, configuration, counters and the error catalog.
//!
//! ## Modules
//!
//! - `keys` - Fixed-length routing keys
//! - `formats` - The three block kinds and their validation rules
//! - `eviction` - LRU recency index
//! - `entities` - Records as the engine and record stores see them
//! - `config` - Store configuration
//! - `metrics` - Hit/miss/write counters
//! - `errors` - Error types

pub mod config;
pub mod entities;
pub mod errors;
pub mod eviction;
pub mod formats;
pub mod keys;
pub mod metrics;
