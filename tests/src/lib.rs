//! # hw-wallet Test Suite
//!
//! Unified test crate for cross-module scenarios against a mock device.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scheduling.rs   # Single-flight, FIFO, probe cadence, spacing
//!     ├── caching.rs      # Per-device cache validity and invalidation
//!     └── cancellation.rs # Channel close, late results, device swap/loss
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p hw-wallet-tests
//!
//! # By category
//! cargo test -p hw-wallet-tests integration::scheduling::
//! cargo test -p hw-wallet-tests integration::caching::
//! cargo test -p hw-wallet-tests integration::cancellation::
//! ```

#![allow(dead_code)]
