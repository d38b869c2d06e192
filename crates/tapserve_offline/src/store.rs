//! The offline store.

use crate::error::{StoreError, StoreResult};
use crate::journal::{Journal, JournalEntry};
use crate::model::{
    CompactionStats, LocalDelete, MutationType, OfflineExpense, QueueItemPatch, StorageStats,
    SyncQueueItem, LAST_SYNC_TIME_KEY,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tapserve_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageResult};
use tapserve_sync_protocol::{now_iso, ExpensePatch};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Opens the backend that holds the journal.
///
/// Called lazily on first use and again after a failed attempt, so a store
/// created in a context without persistence keeps answering
/// [`StoreError::StorageUnavailable`] instead of aborting.
pub type BackendOpener = Box<dyn Fn() -> StorageResult<Box<dyn StorageBackend>> + Send + Sync>;

/// Configuration for an [`OfflineStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// fsync after every journal append instead of a plain flush.
    pub sync_on_write: bool,
    /// Auto-compact once the journal holds this many superseded entries.
    /// Zero disables auto-compaction.
    pub compaction_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: false,
            compaction_threshold: 1024,
        }
    }
}

impl StoreConfig {
    /// Sets fsync-per-write.
    #[must_use]
    pub fn with_sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Sets the auto-compaction threshold.
    #[must_use]
    pub fn with_compaction_threshold(mut self, entries: usize) -> Self {
        self.compaction_threshold = entries;
        self
    }
}

/// In-memory indexes rebuilt from the journal.
#[derive(Debug)]
struct StoreState {
    journal: Journal,
    expenses: HashMap<String, OfflineExpense>,
    queue: HashMap<String, SyncQueueItem>,
    failed: HashMap<String, SyncQueueItem>,
    metadata: HashMap<String, String>,
    next_seq: u64,
    written_entries: usize,
}

impl StoreState {
    fn open(journal: Journal) -> StoreResult<Self> {
        let mut state = Self {
            journal,
            expenses: HashMap::new(),
            queue: HashMap::new(),
            failed: HashMap::new(),
            metadata: HashMap::new(),
            next_seq: 1,
            written_entries: 0,
        };
        let batches = state.journal.replay()?;
        for batch in batches {
            state.written_entries += batch.len();
            for entry in batch {
                state.apply(entry);
            }
        }
        Ok(state)
    }

    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::PutExpense(record) => {
                self.expenses.insert(record.expense.id.clone(), record);
            }
            JournalEntry::RemoveExpense(id) => {
                self.expenses.remove(&id);
            }
            JournalEntry::PutQueueItem(item) => {
                self.next_seq = self.next_seq.max(item.seq + 1);
                self.queue.insert(item.id.clone(), item);
            }
            JournalEntry::RemoveQueueItem(id) => {
                self.queue.remove(&id);
            }
            JournalEntry::PutFailed(item) => {
                self.failed.insert(item.id.clone(), item);
            }
            JournalEntry::RemoveFailed(id) => {
                self.failed.remove(&id);
            }
            JournalEntry::SetMeta(key, value) => {
                self.metadata.insert(key, value);
            }
            JournalEntry::Clear => {
                self.expenses.clear();
                self.queue.clear();
                self.failed.clear();
                self.metadata.clear();
            }
        }
    }

    /// Journals `batch`, then applies it to the indexes.
    fn commit(&mut self, batch: Vec<JournalEntry>) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.journal.append(&batch)?;
        self.written_entries += batch.len();
        for entry in batch {
            self.apply(entry);
        }
        Ok(())
    }

    fn live_entries(&self) -> usize {
        self.expenses.len() + self.queue.len() + self.failed.len() + self.metadata.len()
    }

    fn snapshot(&self) -> Vec<JournalEntry> {
        let mut batch = Vec::with_capacity(self.live_entries());
        batch.extend(self.expenses.values().cloned().map(JournalEntry::PutExpense));
        let mut queue: Vec<_> = self.queue.values().cloned().collect();
        queue.sort_by_key(|item| item.seq);
        batch.extend(queue.into_iter().map(JournalEntry::PutQueueItem));
        batch.extend(self.failed.values().cloned().map(JournalEntry::PutFailed));
        batch.extend(
            self.metadata
                .iter()
                .map(|(k, v)| JournalEntry::SetMeta(k.clone(), v.clone())),
        );
        batch
    }

    fn compact(&mut self) -> StoreResult<CompactionStats> {
        let bytes_before = self.journal.size()?;
        let snapshot = self.snapshot();
        self.journal.rewrite(&snapshot)?;
        self.written_entries = snapshot.len();
        let bytes_after = self.journal.size()?;
        tracing::info!(bytes_before, bytes_after, "compacted offline journal");
        Ok(CompactionStats {
            bytes_before,
            bytes_after,
        })
    }

    fn maybe_compact(&mut self, threshold: usize) -> StoreResult<()> {
        if threshold == 0 {
            return Ok(());
        }
        let superseded = self.written_entries.saturating_sub(self.live_entries());
        if superseded >= threshold {
            self.compact()?;
        }
        Ok(())
    }

    /// True if a create for `id` has not reached the server yet, whether it
    /// is still queued or was evicted.
    fn has_unpushed_create(&self, id: &str) -> bool {
        self.queue
            .get(id)
            .or_else(|| self.failed.get(id))
            .is_some_and(|item| item.kind == MutationType::Create)
    }

    fn queue_entry(&self, mut item: SyncQueueItem) -> JournalEntry {
        item.seq = self
            .queue
            .get(&item.id)
            .map_or(self.next_seq, |existing| existing.seq);
        JournalEntry::PutQueueItem(item)
    }
}

/// Durable store for offline expenses, their pending mutations and a
/// small metadata area.
///
/// All operations are async and serialized through one lock, so two
/// callers writing the same id never interleave inside a record; the last
/// writer wins. The backing journal is opened on first use.
///
/// # Example
///
/// ```rust
/// use tapserve_offline::OfflineStore;
/// use tapserve_sync_protocol::ExpensePatch;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = OfflineStore::in_memory();
/// let saved = store
///     .save_offline(ExpensePatch::new().with_amount(500.0))
///     .await
///     .unwrap();
/// assert!(saved.created_offline);
/// assert_eq!(store.list_queue().await.unwrap().len(), 1);
/// # });
/// ```
pub struct OfflineStore {
    opener: BackendOpener,
    config: StoreConfig,
    state: Mutex<Option<StoreState>>,
}

impl std::fmt::Debug for OfflineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OfflineStore {
    /// Creates a store that opens its backend through `opener` on first use.
    pub fn lazy(opener: BackendOpener, config: StoreConfig) -> Self {
        Self {
            opener,
            config,
            state: Mutex::new(None),
        }
    }

    /// Creates a store over an existing backend.
    pub fn with_backend<B>(backend: B, config: StoreConfig) -> Self
    where
        B: StorageBackend + Clone + 'static,
    {
        Self::lazy(
            Box::new(move || -> StorageResult<Box<dyn StorageBackend>> {
                Ok(Box::new(backend.clone()))
            }),
            config,
        )
    }

    /// Creates a store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::with_backend(InMemoryBackend::new(), StoreConfig::default())
    }

    /// Creates a store backed by a journal file at `path`.
    pub fn open_file(path: impl Into<PathBuf>, config: StoreConfig) -> Self {
        let path = path.into();
        Self::lazy(
            Box::new(move || -> StorageResult<Box<dyn StorageBackend>> {
                Ok(Box::new(FileBackend::open_with_create_dirs(&path)?))
            }),
            config,
        )
    }

    /// Opens the backing store now instead of on first use.
    pub async fn open(&self) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        self.ensure_open(&mut guard)?;
        Ok(())
    }

    fn ensure_open<'a>(&self, slot: &'a mut Option<StoreState>) -> StoreResult<&'a mut StoreState> {
        if slot.is_none() {
            let backend = (self.opener)().map_err(|e| {
                tracing::warn!(error = %e, "offline storage unavailable");
                StoreError::StorageUnavailable(e.to_string())
            })?;
            let state = StoreState::open(Journal::new(backend, self.config.sync_on_write))?;
            tracing::debug!(
                expenses = state.expenses.len(),
                queued = state.queue.len(),
                failed = state.failed.len(),
                "offline store opened"
            );
            *slot = Some(state);
        }
        slot.as_mut()
            .ok_or_else(|| StoreError::StorageUnavailable("store not open".into()))
    }

    async fn with_state<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.state.lock().await;
        let state = self.ensure_open(&mut guard)?;
        let out = f(state)?;
        state.maybe_compact(self.config.compaction_threshold)?;
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Expenses
    // ------------------------------------------------------------------

    /// Stores a local create or edit and queues the matching mutation.
    ///
    /// Without an id, a local id is generated and the record is marked
    /// `created_offline`. With an id, the patch is applied over the stored
    /// record, if any, and its version is bumped. The queued mutation stays
    /// `create` while an earlier create for the same id has not reached the
    /// server; otherwise a new local record queues `create` and an edit
    /// queues `update`. Record and queue item are written as one unit.
    pub async fn save_offline(&self, patch: ExpensePatch) -> StoreResult<OfflineExpense> {
        self.with_state(|state| {
            let now = now_iso();
            let existing = patch.id.as_ref().and_then(|id| state.expenses.get(id));

            let record = match (&patch.id, existing) {
                (None, _) => {
                    let id = generate_local_id();
                    let mut expense = patch.to_expense();
                    expense.id = id.clone();
                    if expense.created_at.is_empty() {
                        expense.created_at = now.clone();
                    }
                    expense.updated_at = now.clone();
                    OfflineExpense {
                        expense,
                        local_id: id,
                        synced: false,
                        sync_error: None,
                        last_sync_attempt: None,
                        created_offline: true,
                        version: 1,
                    }
                }
                (Some(_), Some(existing)) => {
                    let mut expense = patch.applied(&existing.expense);
                    expense.id = existing.expense.id.clone();
                    expense.updated_at = now.clone();
                    OfflineExpense {
                        expense,
                        local_id: existing.local_id.clone(),
                        synced: false,
                        sync_error: None,
                        last_sync_attempt: existing.last_sync_attempt.clone(),
                        created_offline: existing.created_offline,
                        version: existing.version + 1,
                    }
                }
                (Some(id), None) => {
                    let mut expense = patch.to_expense();
                    if expense.created_at.is_empty() {
                        expense.created_at = now.clone();
                    }
                    expense.updated_at = now.clone();
                    OfflineExpense {
                        expense,
                        local_id: id.clone(),
                        synced: false,
                        sync_error: None,
                        last_sync_attempt: None,
                        created_offline: false,
                        version: 1,
                    }
                }
            };

            let id = record.expense.id.clone();
            let kind = if (record.created_offline && existing.is_none())
                || state.has_unpushed_create(&id)
            {
                MutationType::Create
            } else {
                MutationType::Update
            };

            let item = SyncQueueItem::new(kind, record.expense.clone());
            let mut batch = vec![
                JournalEntry::PutExpense(record.clone()),
                state.queue_entry(item),
            ];
            if state.failed.contains_key(&id) {
                batch.push(JournalEntry::RemoveFailed(id.clone()));
            }
            state.commit(batch)?;
            tracing::debug!(%id, kind = %kind, version = record.version, "saved expense offline");
            Ok(record)
        })
        .await
    }

    /// Returns the record with this id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<OfflineExpense>> {
        self.with_state(|state| Ok(state.expenses.get(id).cloned()))
            .await
    }

    /// Returns all records, optionally filtered by tenant and outlet.
    /// Order is unspecified.
    pub async fn list_all(
        &self,
        tenant_id: Option<&str>,
        outlet_id: Option<&str>,
    ) -> StoreResult<Vec<OfflineExpense>> {
        self.with_state(|state| {
            Ok(state
                .expenses
                .values()
                .filter(|record| record.in_scope(tenant_id, outlet_id))
                .cloned()
                .collect())
        })
        .await
    }

    /// Returns all records with `synced = false`.
    pub async fn list_unsynced(&self) -> StoreResult<Vec<OfflineExpense>> {
        self.with_state(|state| {
            Ok(state
                .expenses
                .values()
                .filter(|record| !record.synced)
                .cloned()
                .collect())
        })
        .await
    }

    /// Number of records with `synced = false`.
    pub async fn unsynced_count(&self) -> StoreResult<usize> {
        self.with_state(|state| Ok(state.expenses.values().filter(|r| !r.synced).count()))
            .await
    }

    /// Inserts or replaces a record without touching the queue.
    ///
    /// Used by the pull phase to store server records.
    pub async fn put(&self, record: OfflineExpense) -> StoreResult<()> {
        self.with_state(|state| state.commit(vec![JournalEntry::PutExpense(record)]))
            .await
    }

    /// Marks a record as accepted by the server.
    ///
    /// Fields present in `server` overwrite the local ones; fields the
    /// server left out keep their local values. If the server
    /// assigned a different id the record is re-keyed under it; `local_id`
    /// keeps the original. The queue item and any evicted item for the old
    /// id are removed. Returns `None` if the record no longer exists.
    pub async fn mark_synced(
        &self,
        id: &str,
        server: Option<ExpensePatch>,
    ) -> StoreResult<Option<OfflineExpense>> {
        self.with_state(|state| {
            let mut batch = vec![
                JournalEntry::RemoveQueueItem(id.to_string()),
                JournalEntry::RemoveFailed(id.to_string()),
            ];
            let Some(existing) = state.expenses.get(id) else {
                state.commit(batch)?;
                return Ok(None);
            };

            let mut record = existing.clone();
            if let Some(server) = server {
                record.expense = server.applied(&record.expense);
            }
            if record.expense.id.is_empty() {
                record.expense.id = id.to_string();
            }
            record.synced = true;
            record.sync_error = None;
            record.last_sync_attempt = Some(now_iso());

            let new_id = record.expense.id.clone();
            if new_id != id {
                tracing::debug!(local_id = %id, server_id = %new_id, "server assigned new id");
                batch.push(JournalEntry::RemoveExpense(id.to_string()));
            }
            batch.push(JournalEntry::PutExpense(record.clone()));
            state.commit(batch)?;
            Ok(Some(record))
        })
        .await
    }

    /// Stamps a sync failure on the record without changing `synced`.
    pub async fn mark_sync_error(&self, id: &str, message: &str) -> StoreResult<()> {
        self.with_state(|state| {
            let Some(existing) = state.expenses.get(id) else {
                return Ok(());
            };
            let mut record = existing.clone();
            record.sync_error = Some(message.to_string());
            record.last_sync_attempt = Some(now_iso());
            state.commit(vec![JournalEntry::PutExpense(record)])
        })
        .await
    }

    /// Removes the record, its queue item and any evicted item.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.with_state(|state| {
            state.commit(vec![
                JournalEntry::RemoveExpense(id.to_string()),
                JournalEntry::RemoveQueueItem(id.to_string()),
                JournalEntry::RemoveFailed(id.to_string()),
            ])
        })
        .await
    }

    /// Deletes a record locally.
    ///
    /// A record whose create never reached the server is removed at once.
    /// Anything else is marked unsynced and a `delete` mutation replaces
    /// its queue item; it is removed when that delete is pushed.
    pub async fn mark_deleted(&self, id: &str) -> StoreResult<LocalDelete> {
        self.with_state(|state| {
            let Some(existing) = state.expenses.get(id) else {
                return Err(StoreError::NotFound(id.to_string()));
            };

            if state.has_unpushed_create(id) {
                state.commit(vec![
                    JournalEntry::RemoveExpense(id.to_string()),
                    JournalEntry::RemoveQueueItem(id.to_string()),
                    JournalEntry::RemoveFailed(id.to_string()),
                ])?;
                tracing::debug!(%id, "removed never-synced expense");
                return Ok(LocalDelete::Removed);
            }

            let mut record = existing.clone();
            record.synced = false;
            record.version += 1;
            let item = SyncQueueItem::new(MutationType::Delete, record.expense.clone());
            let batch = vec![
                JournalEntry::PutExpense(record),
                state.queue_entry(item),
                JournalEntry::RemoveFailed(id.to_string()),
            ];
            state.commit(batch)?;
            tracing::debug!(%id, "queued expense delete");
            Ok(LocalDelete::Queued)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Adds a queue item, replacing any live item with the same id.
    ///
    /// A replaced item keeps its position in the queue.
    pub async fn enqueue(&self, item: SyncQueueItem) -> StoreResult<()> {
        self.with_state(|state| {
            let entry = state.queue_entry(item);
            state.commit(vec![entry])
        })
        .await
    }

    /// Returns live queue items in queue order.
    pub async fn list_queue(&self) -> StoreResult<Vec<SyncQueueItem>> {
        self.with_state(|state| {
            let mut items: Vec<_> = state.queue.values().cloned().collect();
            items.sort_by_key(|item| item.seq);
            Ok(items)
        })
        .await
    }

    /// Returns the live queue item for `id`.
    pub async fn get_queue_item(&self, id: &str) -> StoreResult<Option<SyncQueueItem>> {
        self.with_state(|state| Ok(state.queue.get(id).cloned()))
            .await
    }

    /// Applies `patch` to the queue item for `id`. Returns the updated
    /// item, or `None` if there is none.
    pub async fn update_queue_item(
        &self,
        id: &str,
        patch: QueueItemPatch,
    ) -> StoreResult<Option<SyncQueueItem>> {
        self.with_state(|state| {
            let Some(existing) = state.queue.get(id) else {
                return Ok(None);
            };
            let mut item = existing.clone();
            patch.apply_to(&mut item);
            state.commit(vec![JournalEntry::PutQueueItem(item.clone())])?;
            Ok(Some(item))
        })
        .await
    }

    /// Removes the queue item for `id`.
    pub async fn dequeue(&self, id: &str) -> StoreResult<()> {
        self.with_state(|state| state.commit(vec![JournalEntry::RemoveQueueItem(id.to_string())]))
            .await
    }

    /// Moves the queue item for `id` out of the queue after it exhausted
    /// its attempts, and stamps `message` on the item and its record.
    ///
    /// Evicted items are not retried automatically; see
    /// [`revive_failed`](Self::revive_failed).
    pub async fn evict(&self, id: &str, message: &str) -> StoreResult<()> {
        self.with_state(|state| {
            let mut batch = vec![JournalEntry::RemoveQueueItem(id.to_string())];
            if let Some(existing) = state.queue.get(id) {
                let mut item = existing.clone();
                item.error = Some(message.to_string());
                batch.push(JournalEntry::PutFailed(item));
            }
            if let Some(existing) = state.expenses.get(id) {
                let mut record = existing.clone();
                record.sync_error = Some(message.to_string());
                record.last_sync_attempt = Some(now_iso());
                batch.push(JournalEntry::PutExpense(record));
            }
            state.commit(batch)?;
            tracing::warn!(%id, error = %message, "evicted queue item");
            Ok(())
        })
        .await
    }

    /// Returns evicted items.
    pub async fn list_failed(&self) -> StoreResult<Vec<SyncQueueItem>> {
        self.with_state(|state| Ok(state.failed.values().cloned().collect()))
            .await
    }

    /// Puts an evicted item back in the queue with its attempts reset.
    ///
    /// If there is no evicted item but the record is unsynced and has no
    /// live item, one is queued from the record. Returns the queued item,
    /// or `None` if there is nothing to retry.
    pub async fn revive_failed(&self, id: &str) -> StoreResult<Option<SyncQueueItem>> {
        self.with_state(|state| {
            if let Some(live) = state.queue.get(id) {
                let mut item = live.clone();
                QueueItemPatch::reset().apply_to(&mut item);
                state.commit(vec![JournalEntry::PutQueueItem(item.clone())])?;
                return Ok(Some(item));
            }

            let item = match (state.failed.get(id), state.expenses.get(id)) {
                (Some(failed), _) => {
                    let mut item = failed.clone();
                    QueueItemPatch::reset().apply_to(&mut item);
                    item
                }
                (None, Some(record)) if !record.synced => {
                    let kind = if record.created_offline {
                        MutationType::Create
                    } else {
                        MutationType::Update
                    };
                    SyncQueueItem::new(kind, record.expense.clone())
                }
                _ => return Ok(None),
            };

            let mut item = item;
            item.seq = state.next_seq;
            state.commit(vec![
                JournalEntry::PutQueueItem(item.clone()),
                JournalEntry::RemoveFailed(id.to_string()),
            ])?;
            Ok(Some(item))
        })
        .await
    }

    /// Resets attempts and error on every live and evicted queue item.
    /// Evicted items stay evicted but stop counting as errors. Returns how
    /// many items changed.
    pub async fn clear_queue_errors(&self) -> StoreResult<usize> {
        self.with_state(|state| {
            let reset = QueueItemPatch::reset();
            let mut batch = Vec::new();
            for item in state.queue.values() {
                if item.attempts > 0 || item.error.is_some() {
                    let mut item = item.clone();
                    reset.apply_to(&mut item);
                    batch.push(JournalEntry::PutQueueItem(item));
                }
            }
            for item in state.failed.values() {
                if item.attempts > 0 || item.error.is_some() {
                    let mut item = item.clone();
                    reset.apply_to(&mut item);
                    batch.push(JournalEntry::PutFailed(item));
                }
            }
            let changed = batch.len();
            state.commit(batch)?;
            Ok(changed)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Metadata and maintenance
    // ------------------------------------------------------------------

    /// Reads a metadata value.
    pub async fn get_metadata(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_state(|state| Ok(state.metadata.get(key).cloned()))
            .await
    }

    /// Writes a metadata value.
    pub async fn set_metadata(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_state(|state| {
            state.commit(vec![JournalEntry::SetMeta(
                key.to_string(),
                value.to_string(),
            )])
        })
        .await
    }

    /// End time of the last sync cycle.
    pub async fn last_sync_time(&self) -> StoreResult<Option<String>> {
        self.get_metadata(LAST_SYNC_TIME_KEY).await
    }

    /// Counts for observability.
    pub async fn storage_stats(&self) -> StoreResult<StorageStats> {
        self.with_state(|state| {
            Ok(StorageStats {
                total_expenses: state.expenses.len(),
                unsynced_expenses: state.expenses.values().filter(|r| !r.synced).count(),
                queued_items: state.queue.len(),
                errored_items: state
                    .queue
                    .values()
                    .chain(state.failed.values())
                    .filter(|i| i.error.is_some())
                    .count(),
                failed_items: state.failed.len(),
                last_sync: state.metadata.get(LAST_SYNC_TIME_KEY).cloned(),
            })
        })
        .await
    }

    /// Drops all records, queue items and metadata.
    pub async fn clear_all(&self) -> StoreResult<()> {
        self.with_state(|state| {
            state.commit(vec![JournalEntry::Clear])?;
            state.compact()?;
            tracing::info!("cleared offline store");
            Ok(())
        })
        .await
    }

    /// Rewrites the journal so it holds only live entries.
    pub async fn compact(&self) -> StoreResult<CompactionStats> {
        let mut guard = self.state.lock().await;
        let state = self.ensure_open(&mut guard)?;
        state.compact()
    }
}

/// Generates an id of the form `local_<millis>_<9 hex chars>`.
pub fn generate_local_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "local_{}_{}",
        Utc::now().timestamp_millis(),
        &random[..9]
    )
}
