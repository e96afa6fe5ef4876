//! # Datastore Test Suite
//!
//! Scenarios that span the membership filter, the block store engine and the
//! typed facades, exercised only through public APIs.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── store_scenarios.rs  # Fetch/put/evict flows across all three kinds
//!     ├── concurrency.rs      # Many threads on one store
//!     └── persistence.rs      # Restart, crash and corruption recovery
//! tests/benches/
//! └── store_benchmarks.rs     # Criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ds-tests
//! cargo test -p ds-tests integration::persistence::
//! cargo bench -p ds-tests
//! ```

pub mod integration;
