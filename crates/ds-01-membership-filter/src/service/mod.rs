//! Thread-safe filter service held by the block store.

mod membership;

pub use membership::{FilterStats, MembershipFilter};
