//! Error types for the offline store.

use tapserve_storage::StorageError;
use thiserror::Error;

/// Result type for offline store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the offline store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable backing store could not be opened.
    ///
    /// Every operation fails with this until an open attempt succeeds.
    #[error("offline storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Backend I/O failed after the store was opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A journal entry could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The journal is damaged before its tail.
    #[error("journal corrupted at offset {offset}: {reason}")]
    Corrupted {
        /// Offset of the damaged frame.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// No record with this id.
    #[error("expense not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns true if the backing store never opened.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
