//! # Tapserve Sync Engine
//!
//! Reconciles the on-device expense store with the expenses API.
//!
//! This crate provides:
//! - [`SyncEngine`]: the Idle/Syncing state machine and the pull-then-push cycle
//! - Retry with exponential backoff and eviction after the last attempt
//! - Manual conflict resolution and per-record forced sync
//! - [`NetworkObserver`] and [`StatusBroadcaster`]: connectivity and status fan-out
//! - [`ExpenseApi`]: the API collaborator, with HTTP and in-memory implementations
//!
//! ## Architecture
//!
//! A cycle pulls first, then pushes:
//! 1. Fetch server records changed since `lastSyncTime` and store the ones
//!    the device does not hold or holds an older synced copy of
//! 2. Push queued mutations one at a time, oldest first
//! 3. Record the cycle end as the new `lastSyncTime`
//!
//! ## Key Invariants
//!
//! - At most one cycle runs at a time, and only while online
//! - A pulled record never overwrites an unsynced local record
//! - One pending retry timer per expense id
//! - A mutation is evicted once it has failed `max_attempts` times

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
mod observer;
mod scheduler;
mod state;
mod status;
mod transport;

pub use config::{RetryConfig, SyncConfig, DEFAULT_BASE_URL};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpExpenseApi, HttpResponse, Method, ReqwestClient};
pub use observer::NetworkObserver;
pub use scheduler::TaskScheduler;
pub use state::{SyncFailure, SyncReport, SyncState, SyncStats};
pub use status::{ListenerId, StatusBroadcaster, StatusListener, SyncStatus};
pub use transport::{ExpenseApi, MockCall, MockExpenseApi, MockFailure};
