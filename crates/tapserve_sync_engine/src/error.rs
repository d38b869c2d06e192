//! Error types for the sync engine.

use tapserve_offline::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The offline store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered `success: false`.
    #[error("{0}")]
    ServerRejected(String),

    /// The device is offline.
    #[error("device is offline")]
    Offline,

    /// A sync cycle is already running.
    #[error("sync already in progress")]
    AlreadySyncing,

    /// The mutation exhausted its attempts.
    #[error("Max attempts reached: {0}")]
    PermanentFailure(String),

    /// Unexpected response shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// Server rejections count as retryable: they feed the same attempt
    /// counter as network failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::ServerRejected(_) => true,
            SyncError::Protocol(_) => true,
            _ => false,
        }
    }
}
