//! Records held by the offline store.

use serde::{Deserialize, Serialize};
use tapserve_sync_protocol::Expense;

/// Metadata key holding the end time of the last sync cycle.
pub const LAST_SYNC_TIME_KEY: &str = "lastSyncTime";

/// An expense plus the bookkeeping the offline layer attaches to it.
///
/// Serialized flat: the expense fields and the offline fields share one
/// object, which keeps the JSON shape the UI layer already consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineExpense {
    /// Domain fields.
    #[serde(flatten)]
    pub expense: Expense,
    /// Id assigned when the record was first stored locally. Survives a
    /// server-assigned id rewrite.
    pub local_id: String,
    /// True once the server has accepted the current version.
    pub synced: bool,
    /// Last failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
    /// Time of the most recent sync attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_attempt: Option<String>,
    /// True if the record originated locally before reaching the server.
    pub created_offline: bool,
    /// Local revision, incremented on every local mutation.
    pub version: u64,
}

impl OfflineExpense {
    /// Wraps a record fetched from the server. It starts out synced.
    pub fn from_server(expense: Expense) -> Self {
        Self {
            local_id: expense.id.clone(),
            expense,
            synced: true,
            sync_error: None,
            last_sync_attempt: None,
            created_offline: false,
            version: 1,
        }
    }

    /// Canonical id.
    pub fn id(&self) -> &str {
        &self.expense.id
    }

    /// Returns true if the record belongs to the given tenant and outlet.
    /// `None` matches anything.
    pub fn in_scope(&self, tenant_id: Option<&str>, outlet_id: Option<&str>) -> bool {
        tenant_id.map_or(true, |t| self.expense.tenant_id == t)
            && outlet_id.map_or(true, |o| self.expense.outlet_id == o)
    }
}

/// Kind of pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    /// POST a new record.
    Create,
    /// PUT changed fields.
    Update,
    /// DELETE the record.
    Delete,
}

impl MutationType {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationType::Create => "create",
            MutationType::Update => "update",
            MutationType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MutationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending mutation, keyed by the id of the expense it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    /// Target expense id.
    pub id: String,
    /// Mutation kind.
    #[serde(rename = "type")]
    pub kind: MutationType,
    /// Snapshot of the expense when the item was (re)queued.
    pub data: Expense,
    /// Failed attempts so far.
    pub attempts: u32,
    /// Time of the most recent attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<String>,
    /// Last failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Position in the queue. Replacing an item keeps its position.
    #[serde(default)]
    pub seq: u64,
}

impl SyncQueueItem {
    /// A fresh item with no attempts.
    pub fn new(kind: MutationType, data: Expense) -> Self {
        Self {
            id: data.id.clone(),
            kind,
            data,
            attempts: 0,
            last_attempt: None,
            error: None,
            seq: 0,
        }
    }
}

/// Field-level update for a [`SyncQueueItem`].
///
/// `last_attempt` and `error` are doubly optional: the outer `None` leaves
/// the field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueItemPatch {
    /// New attempt count.
    pub attempts: Option<u32>,
    /// New last-attempt time.
    pub last_attempt: Option<Option<String>>,
    /// New error.
    pub error: Option<Option<String>>,
}

impl QueueItemPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed attempt.
    pub fn failed_attempt(attempts: u32, at: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            attempts: Some(attempts),
            last_attempt: Some(Some(at.into())),
            error: Some(Some(error.into())),
        }
    }

    /// Resets attempts, last attempt and error.
    pub fn reset() -> Self {
        Self {
            attempts: Some(0),
            last_attempt: Some(None),
            error: Some(None),
        }
    }

    pub(crate) fn apply_to(&self, item: &mut SyncQueueItem) {
        if let Some(attempts) = self.attempts {
            item.attempts = attempts;
        }
        if let Some(last_attempt) = &self.last_attempt {
            item.last_attempt = last_attempt.clone();
        }
        if let Some(error) = &self.error {
            item.error = error.clone();
        }
    }
}

/// Outcome of a local delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDelete {
    /// The record never reached the server and is gone.
    Removed,
    /// A delete mutation was queued; the record stays until it is pushed.
    Queued,
}

/// Counters describing the store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// All stored records.
    pub total_expenses: usize,
    /// Records with `synced = false`.
    pub unsynced_expenses: usize,
    /// Live queue items.
    pub queued_items: usize,
    /// Live or evicted queue items carrying a recorded error.
    pub errored_items: usize,
    /// Items evicted after exhausting their attempts.
    pub failed_items: usize,
    /// End of the last sync cycle.
    pub last_sync: Option<String>,
}

impl StorageStats {
    /// True if any mutation, live or evicted, carries a recorded error.
    ///
    /// An evicted item whose error was cleared still counts in
    /// `failed_items` but no longer raises this flag.
    pub fn has_errors(&self) -> bool {
        self.errored_items > 0
    }
}

/// Journal sizes before and after compaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Bytes before.
    pub bytes_before: u64,
    /// Bytes after.
    pub bytes_after: u64,
}
