//! # Tapserve Testkit
//!
//! Test utilities for the Tapserve sync crates.
//!
//! This crate provides:
//! - Expense fixtures and timestamp helpers
//! - Memory and file-backed offline stores with automatic cleanup
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tapserve_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn saves_offline() {
//!     let store = TestStore::memory();
//!     let saved = store.save_offline(new_expense(500.0)).await.unwrap();
//!     assert!(!saved.synced);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
