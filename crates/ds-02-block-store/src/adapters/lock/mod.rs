//! # Store Process Locking
//!
//! Prevents two processes from opening the same store files.

mod flock;

pub use crate::domain::errors::LockError;
pub use flock::DatabaseLock;
