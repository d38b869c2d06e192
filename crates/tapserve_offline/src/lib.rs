//! # Tapserve Offline
//!
//! The on-device store behind offline-first expense capture.
//!
//! [`OfflineStore`] keeps three collections in memory and makes them durable
//! through an append-only journal on a [`tapserve_storage::StorageBackend`]:
//!
//! - expenses, each wrapped with offline bookkeeping ([`OfflineExpense`])
//! - the mutation queue, at most one live [`SyncQueueItem`] per expense id
//! - a small key/value metadata area (for example `lastSyncTime`)
//!
//! Items that exhaust their sync attempts are moved to a separate failed
//! collection where they wait for an explicit retry.
//!
//! ## Invariants
//!
//! - A record with `synced = false` has a live or evicted queue item, and
//!   every live queue item belongs to an unsynced record
//! - Record and queue writes of one operation are journaled as one frame

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod journal;
mod model;
mod store;

pub use error::{StoreError, StoreResult};
pub use journal::{compute_crc32, JournalEntry, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use model::{
    CompactionStats, LocalDelete, MutationType, OfflineExpense, QueueItemPatch, StorageStats,
    SyncQueueItem, LAST_SYNC_TIME_KEY,
};
pub use store::{generate_local_id, BackendOpener, OfflineStore, StoreConfig};
