//! # Ports
//!
//! - `inbound`: the store API offered to callers
//! - `outbound`: the record persistence a store depends on

pub mod inbound;
pub mod outbound;

pub use inbound::BlockStoreApi;
pub use outbound::RecordStore;
