//! # Adapters
//!
//! - `storage`: record store implementations (file slots, in-memory)
//! - `lock`: exclusive process lock on a store's files

pub mod lock;
pub mod storage;
