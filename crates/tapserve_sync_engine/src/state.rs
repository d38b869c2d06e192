//! Sync state machine and cycle results.

use serde::{Deserialize, Serialize};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No cycle is running.
    #[default]
    Idle,
    /// A cycle is running.
    Syncing,
}

impl SyncState {
    /// Returns true if a cycle is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }

    /// Returns true if a new cycle may start.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle)
    }
}

/// One failed mutation in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    /// Expense id.
    pub id: String,
    /// Failure reason.
    pub error: String,
}

/// Result of a sync cycle.
///
/// `success` is false only when the cycle could not run or aborted;
/// individual push failures are counted in `failed` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// The cycle ran to completion.
    pub success: bool,
    /// Mutations accepted by the server.
    pub synced: usize,
    /// Mutations that failed.
    pub failed: usize,
    /// One entry per failed mutation.
    pub errors: Vec<SyncFailure>,
    /// Server records stored or refreshed by the pull phase.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pulled: usize,
    /// Reason the cycle aborted, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl SyncReport {
    /// Report for a cycle that did not start.
    pub fn skipped() -> Self {
        Self::default()
    }

    pub(crate) fn started() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub(crate) fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(SyncFailure {
            id: id.into(),
            error: error.into(),
        });
    }

    pub(crate) fn abort(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Cycles that ran.
    pub cycles_completed: u64,
    /// Records stored by pull phases.
    pub records_pulled: u64,
    /// Mutations accepted by the server.
    pub mutations_pushed: u64,
    /// Failed push attempts.
    pub push_failures: u64,
    /// Retries scheduled after a failed push.
    pub retries_scheduled: u64,
    /// Mutations evicted after exhausting their attempts.
    pub evictions: u64,
    /// Last cycle-level error.
    pub last_error: Option<String>,
}
