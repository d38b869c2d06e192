//! # Tapserve Sync Protocol
//!
//! Data types exchanged between the offline store, the sync engine and the
//! expenses REST API.
//!
//! This crate provides:
//! - [`Expense`] and its field-level patch type [`ExpensePatch`]
//! - The `{success, data?, error?}` response envelope ([`ApiResponse`])
//! - Paging and filter types for `GET /expenses`
//! - [`ConflictResolution`] for manual conflict handling
//! - ISO-8601 timestamp helpers
//!
//! This is a pure data crate with no I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod envelope;
mod expense;
mod time;

pub use conflict::{ConflictResolution, ParseResolutionError};
pub use envelope::{ApiResponse, ExpenseFilters, ExpensePage};
pub use expense::{Expense, ExpensePatch, ExpenseStatus, OcrData, OcrFields};
pub use time::{format_iso, now_iso};
