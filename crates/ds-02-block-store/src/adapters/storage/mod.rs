//! Storage Adapters
//!
//! Implementations of the `RecordStore` trait.

mod file;
mod memory;

pub use file::FileRecordStore;
pub use memory::InMemoryRecordStore;
