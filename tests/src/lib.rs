//! # ECHO/HALO Test Suite
//!
//! Unified test crate for cross-crate behavior that no single crate can
//! exercise alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs          # Shared single-party fixture
//!     ├── bootstrap.rs        # Trust bootstrap choreography
//!     ├── causal_delivery.rs  # Randomized causal-order property
//!     ├── stall_recovery.rs   # Stall and recovery scenarios
//!     ├── persistence.rs      # Metadata survival across restarts
//!     └── snapshots.rs        # Pipeline snapshot/restore round trips
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p echo-tests
//!
//! # By scenario
//! cargo test -p echo-tests integration::bootstrap
//! cargo test -p echo-tests integration::causal_delivery
//!
//! # Benchmarks
//! cargo bench -p echo-tests
//! ```

#![allow(dead_code)]

pub mod integration;
