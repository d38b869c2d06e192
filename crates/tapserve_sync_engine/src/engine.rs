//! The sync engine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::scheduler::TaskScheduler;
use crate::state::{SyncReport, SyncState, SyncStats};
use crate::status::{ListenerId, StatusBroadcaster, SyncStatus};
use crate::transport::ExpenseApi;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tapserve_offline::{
    LocalDelete, MutationType, OfflineExpense, OfflineStore, QueueItemPatch, SyncQueueItem,
    LAST_SYNC_TIME_KEY,
};
use tapserve_sync_protocol::{
    now_iso, ApiResponse, ConflictResolution, Expense, ExpenseFilters, ExpensePatch,
};
use tokio::sync::watch;

const SYNC_TASK: &str = "sync";

fn retry_task(id: &str) -> String {
    format!("retry:{id}")
}

/// Resets the engine to idle when a cycle ends, including when the cycle
/// future is dropped.
struct CycleGuard<'a> {
    state: &'a RwLock<SyncState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.state.write() = SyncState::Idle;
    }
}

fn accepted<T>(response: ApiResponse<T>) -> SyncResult<Option<T>> {
    response.into_result().map_err(SyncError::ServerRejected)
}

/// Reconciles the offline store with the expenses API.
///
/// One engine is built at startup and shared as an `Arc`. A cycle pulls
/// server changes, then pushes the mutation queue one item at a time.
/// Only one cycle runs at a time, and only while online. Failed pushes are
/// retried with exponential backoff until the item exhausts its attempts.
pub struct SyncEngine {
    store: Arc<OfflineStore>,
    api: Arc<dyn ExpenseApi>,
    config: SyncConfig,
    online: AtomicBool,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    scheduler: TaskScheduler,
    status: StatusBroadcaster,
    this: Weak<SyncEngine>,
}

impl SyncEngine {
    /// Creates an engine. It starts out online.
    pub fn new(store: Arc<OfflineStore>, api: Arc<dyn ExpenseApi>, config: SyncConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            store,
            api,
            config,
            online: AtomicBool::new(true),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            scheduler: TaskScheduler::new(),
            status: StatusBroadcaster::new(SyncStatus {
                is_online: true,
                ..SyncStatus::default()
            }),
            this: this.clone(),
        })
    }

    /// The store this engine syncs.
    pub fn store(&self) -> &Arc<OfflineStore> {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Counters since the engine was created.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true if a cycle is running.
    pub fn is_syncing(&self) -> bool {
        self.state().is_active()
    }

    /// Returns the last known connectivity.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Opens the store, publishes the first status and, when online,
    /// schedules an initial sync after the reconnect debounce.
    ///
    /// A store that cannot be opened is logged, not returned: the engine
    /// keeps running and every later store call reports the failure.
    pub async fn start(&self) {
        if let Err(e) = self.store.open().await {
            tracing::warn!(error = %e, "offline store unavailable");
        }
        self.refresh_status().await;
        if self.is_online() {
            self.schedule_sync(self.config.reconnect_debounce);
        }
    }

    /// Cancels every pending timer and drops all listeners.
    pub fn destroy(&self) {
        self.scheduler.cancel_all();
        self.status.clear();
        tracing::debug!("sync engine destroyed");
    }

    // ------------------------------------------------------------------
    // Connectivity and status
    // ------------------------------------------------------------------

    /// Records a connectivity change.
    ///
    /// Going online schedules a sync after the reconnect debounce.
    pub async fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online != online {
            tracing::info!(online, "connectivity changed");
        }
        self.refresh_status().await;
        if online && !was_online {
            self.schedule_sync(self.config.reconnect_debounce);
        }
    }

    /// Same as [`is_online`](Self::is_online).
    pub fn get_network_status(&self) -> bool {
        self.is_online()
    }

    /// Number of records not yet accepted by the server.
    pub async fn get_pending_sync_count(&self) -> SyncResult<usize> {
        Ok(self.store.unsynced_count().await?)
    }

    /// Computes a fresh status snapshot without publishing it.
    pub async fn status(&self) -> SyncStatus {
        let mut status = self.status.current();
        status.is_online = self.is_online();
        status.is_syncing = self.is_syncing();
        match self.store.storage_stats().await {
            Ok(stats) => {
                status.pending_count = stats.unsynced_expenses;
                status.has_errors = stats.has_errors();
                status.last_sync = stats.last_sync;
            }
            Err(e) => {
                tracing::warn!(error = %e, "status computed without storage stats");
            }
        }
        status
    }

    /// Recomputes the status and publishes it to every listener.
    pub async fn refresh_status(&self) -> SyncStatus {
        let status = self.status().await;
        self.status.publish(status.clone());
        status
    }

    /// Registers a status callback. It is called at once with a fresh
    /// snapshot, then on every change.
    pub async fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.refresh_status().await;
        self.status.add_listener(listener)
    }

    /// Unregisters a status callback.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.status.remove_listener(id)
    }

    /// Returns a receiver that sees every published status.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    // ------------------------------------------------------------------
    // Local mutations
    // ------------------------------------------------------------------

    /// Saves a local create or edit and schedules a sync.
    pub async fn save_expense(&self, patch: ExpensePatch) -> SyncResult<OfflineExpense> {
        let record = self.store.save_offline(patch).await?;
        self.after_local_mutation().await;
        Ok(record)
    }

    /// Deletes a record locally and schedules a sync.
    pub async fn delete_expense(&self, id: &str) -> SyncResult<LocalDelete> {
        let outcome = self.store.mark_deleted(id).await?;
        self.after_local_mutation().await;
        Ok(outcome)
    }

    async fn after_local_mutation(&self) {
        self.refresh_status().await;
        self.schedule_sync(self.config.post_mutation_delay);
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Schedules a cycle after `delay`, replacing any earlier request.
    ///
    /// Does nothing while offline or syncing. The cycle only runs if the
    /// engine is still online and idle when the delay elapses.
    pub fn schedule_sync(&self, delay: Duration) -> bool {
        if !self.is_online() || self.is_syncing() {
            return false;
        }
        let engine = self.this.clone();
        let scheduled = self.scheduler.schedule(SYNC_TASK, delay, async move {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            if engine.is_online() && !engine.is_syncing() {
                engine.sync_all().await;
            }
        });
        if scheduled {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "sync scheduled");
        }
        scheduled
    }

    fn schedule_retry(&self, id: &str, delay: Duration) {
        let engine = self.this.clone();
        let scheduled = self.scheduler.schedule(retry_task(id), delay, async move {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            if engine.is_online() {
                engine.sync_all().await;
            }
        });
        if scheduled {
            self.stats.write().retries_scheduled += 1;
        }
    }

    /// Returns true if a retry timer is pending for this expense.
    pub fn has_pending_retry(&self, id: &str) -> bool {
        self.scheduler.is_scheduled(&retry_task(id))
    }

    /// Number of pending timers, sync requests and retries together.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    // ------------------------------------------------------------------
    // Sync cycle
    // ------------------------------------------------------------------

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        let mut state = self.state.write();
        if !state.can_start_sync() {
            return None;
        }
        *state = SyncState::Syncing;
        Some(CycleGuard { state: &self.state })
    }

    /// Runs one pull-then-push cycle.
    ///
    /// Returns an empty unsuccessful report at once when offline or when
    /// another cycle is running. Per-item push failures are counted in the
    /// report and do not make it unsuccessful; a storage failure aborts the
    /// cycle and does.
    pub async fn sync_all(&self) -> SyncReport {
        if !self.is_online() {
            tracing::debug!(reason = %SyncError::Offline, "sync skipped");
            return SyncReport::skipped();
        }
        let Some(guard) = self.try_begin() else {
            tracing::debug!(reason = %SyncError::AlreadySyncing, "sync skipped");
            return SyncReport::skipped();
        };

        self.refresh_status().await;
        let started = Instant::now();
        tracing::info!("sync cycle started");

        let mut report = SyncReport::started();
        if let Err(e) = self.run_cycle(&mut report).await {
            tracing::error!(error = %e, "sync cycle aborted");
            self.stats.write().last_error = Some(e.to_string());
            report.abort(e.to_string());
        }
        drop(guard);

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.records_pulled += report.pulled as u64;
            stats.mutations_pushed += report.synced as u64;
        }
        tracing::info!(
            success = report.success,
            pulled = report.pulled,
            synced = report.synced,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync cycle finished"
        );
        self.refresh_status().await;
        report
    }

    async fn run_cycle(&self, report: &mut SyncReport) -> SyncResult<()> {
        match self.pull().await {
            Ok(pulled) => report.pulled = pulled,
            Err(SyncError::Storage(e)) => return Err(e.into()),
            Err(e) => tracing::warn!(error = %e, "pull failed, skipping to push"),
        }

        for item in self.store.list_queue().await? {
            match self.push_item(&item).await {
                Ok(()) => {
                    self.scheduler.cancel(&retry_task(&item.id));
                    report.synced += 1;
                }
                Err(SyncError::Storage(e)) => return Err(e.into()),
                Err(e) => {
                    report.record_failure(&item.id, &e.to_string());
                    self.record_failure(&item, &e).await?;
                }
            }
        }

        self.store
            .set_metadata(LAST_SYNC_TIME_KEY, &now_iso())
            .await?;
        Ok(())
    }

    /// Fetches server records changed since the last cycle, page by page,
    /// and stores the ones the local side should take.
    async fn pull(&self) -> SyncResult<usize> {
        let since = self.store.last_sync_time().await?;
        let limit = self.config.pull_page_size;
        let mut page = 1;
        let mut received = 0u64;
        let mut stored = 0;

        loop {
            let mut filters = ExpenseFilters::new().paged(page, limit);
            if let Some(since) = &since {
                filters = filters.since(since.clone());
            }
            let Some(data) = accepted(self.api.get_expenses(&filters).await?)? else {
                break;
            };

            received += data.items.len() as u64;
            let more = data.has_more(received);
            for server in data.items {
                if self.apply_pulled(server).await? {
                    stored += 1;
                }
            }
            if !more {
                break;
            }
            page += 1;
        }

        tracing::debug!(received, stored, "pull finished");
        Ok(stored)
    }

    /// Stores a pulled record if it is new, or if the local copy is synced
    /// and older. An unsynced local copy is never overwritten.
    ///
    /// `updatedAt` values are compared as strings, which orders correctly
    /// only while every timestamp uses the same UTC format.
    async fn apply_pulled(&self, server: Expense) -> SyncResult<bool> {
        match self.store.get(&server.id).await? {
            None => {
                self.store.put(OfflineExpense::from_server(server)).await?;
                Ok(true)
            }
            Some(local) if !local.synced => {
                tracing::debug!(id = %server.id, "keeping unsynced local edit over pulled record");
                Ok(false)
            }
            Some(local) if server.updated_at > local.expense.updated_at => {
                let record = OfflineExpense {
                    expense: server,
                    synced: true,
                    ..local
                };
                self.store.put(record).await?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    async fn push_item(&self, item: &SyncQueueItem) -> SyncResult<()> {
        let id = item.data.id.as_str();
        match item.kind {
            MutationType::Create => {
                let created = accepted(self.api.create_expense(&item.data).await?)?;
                self.store.mark_synced(&item.id, created).await?;
            }
            MutationType::Update => {
                let updated = accepted(self.api.update_expense(id, &item.data).await?)?;
                self.store.mark_synced(&item.id, updated).await?;
            }
            MutationType::Delete => {
                accepted(self.api.delete_expense(id).await?)?;
                self.store.delete(&item.id).await?;
            }
        }
        tracing::debug!(id = %item.id, kind = %item.kind, "pushed mutation");
        Ok(())
    }

    /// Counts a failed push. Schedules a retry while attempts remain and
    /// evicts the item once they run out.
    async fn record_failure(&self, item: &SyncQueueItem, error: &SyncError) -> SyncResult<()> {
        let message = error.to_string();
        let attempts = item.attempts + 1;
        self.scheduler.cancel(&retry_task(&item.id));
        self.stats.write().push_failures += 1;

        self.store
            .update_queue_item(
                &item.id,
                QueueItemPatch::failed_attempt(attempts, now_iso(), message.as_str()),
            )
            .await?;
        self.store.mark_sync_error(&item.id, &message).await?;

        if self.config.retry.is_exhausted(attempts) {
            let permanent = SyncError::PermanentFailure(message.clone()).to_string();
            self.store.evict(&item.id, &permanent).await?;
            self.stats.write().evictions += 1;
        } else {
            let delay = self.config.retry.delay_for_attempt(attempts);
            tracing::warn!(
                id = %item.id,
                attempts,
                retry_in_ms = delay.as_millis() as u64,
                retryable = error.is_retryable(),
                error = %message,
                "push failed"
            );
            self.schedule_retry(&item.id, delay);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Manual operations
    // ------------------------------------------------------------------

    /// Pushes the mutation for one expense now.
    ///
    /// An evicted item is put back in the queue with its attempts reset.
    /// Returns false when offline, when there is nothing to push, or when
    /// the push fails; a failure counts as an attempt like in a cycle.
    pub async fn force_sync_expense(&self, id: &str) -> bool {
        if !self.is_online() {
            return false;
        }
        let outcome = self.force_push(id).await;
        self.refresh_status().await;
        match outcome {
            Ok(pushed) => pushed,
            Err(e) => {
                tracing::warn!(%id, error = %e, "forced sync failed");
                false
            }
        }
    }

    async fn force_push(&self, id: &str) -> SyncResult<bool> {
        let item = match self.store.get_queue_item(id).await? {
            Some(item) => item,
            None => match self.store.revive_failed(id).await? {
                Some(item) => {
                    tracing::info!(%id, "revived evicted mutation");
                    item
                }
                None => return Ok(false),
            },
        };

        match self.push_item(&item).await {
            Ok(()) => {
                self.scheduler.cancel(&retry_task(id));
                self.stats.write().mutations_pushed += 1;
                Ok(true)
            }
            Err(SyncError::Storage(e)) => Err(e.into()),
            Err(e) => {
                self.record_failure(&item, &e).await?;
                Ok(false)
            }
        }
    }

    /// Settles a divergence between a local record and a server record.
    ///
    /// - `Local` keeps the local record and queues it as an update.
    /// - `Server` takes the server record as synced.
    /// - `Merge` lays the local fields over the server record, bumps the
    ///   version and queues the result as an update.
    ///
    /// The cycle never calls this; the caller picks the resolution.
    pub async fn resolve_conflict(
        &self,
        local: &OfflineExpense,
        server: &Expense,
        resolution: ConflictResolution,
    ) -> SyncResult<OfflineExpense> {
        let id = local.id().to_string();
        let record = match resolution {
            ConflictResolution::Local => {
                let record = OfflineExpense {
                    synced: false,
                    ..local.clone()
                };
                self.requeue(record).await?
            }
            ConflictResolution::Server => match self
                .store
                .mark_synced(&id, Some(ExpensePatch::from(server)))
                .await?
            {
                Some(record) => record,
                None => {
                    let record = OfflineExpense::from_server(server.clone());
                    self.store.put(record.clone()).await?;
                    record
                }
            },
            ConflictResolution::Merge => {
                let mut expense = local.expense.overlaid_on(server);
                expense.updated_at = now_iso();
                let record = OfflineExpense {
                    expense,
                    synced: false,
                    version: local.version + 1,
                    ..local.clone()
                };
                self.requeue(record).await?
            }
        };
        tracing::info!(%id, %resolution, "conflict resolved");
        self.refresh_status().await;
        Ok(record)
    }

    async fn requeue(&self, record: OfflineExpense) -> SyncResult<OfflineExpense> {
        self.store.put(record.clone()).await?;
        self.store
            .enqueue(SyncQueueItem::new(MutationType::Update, record.expense.clone()))
            .await?;
        Ok(record)
    }

    /// Resets attempts and errors on every queued and evicted mutation
    /// without retrying them.
    pub async fn clear_errors(&self) -> SyncResult<usize> {
        let cleared = self.store.clear_queue_errors().await?;
        tracing::info!(cleared, "cleared sync errors");
        self.refresh_status().await;
        Ok(cleared)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("online", &self.is_online())
            .field("state", &self.state())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::transport::{MockCall, MockExpenseApi, MockFailure};

    fn setup() -> (Arc<SyncEngine>, Arc<MockExpenseApi>) {
        let api = Arc::new(MockExpenseApi::new());
        let engine = SyncEngine::new(
            Arc::new(OfflineStore::in_memory()),
            api.clone(),
            SyncConfig::default(),
        );
        (engine, api)
    }

    fn server_expense(id: &str, updated_at: &str, amount: f64) -> Expense {
        Expense {
            id: id.into(),
            amount,
            tenant_id: "t1".into(),
            outlet_id: "o1".into(),
            created_at: "2024-01-01T00:00:00.000Z".into(),
            updated_at: updated_at.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn offline_cycle_is_refused() {
        let (engine, api) = setup();
        engine.set_online(false).await;

        let report = engine.sync_all().await;
        assert_eq!(report, SyncReport::skipped());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn create_is_pushed_and_rekeyed() {
        let (engine, api) = setup();
        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(500.0))
            .await
            .unwrap();

        let report = engine.sync_all().await;
        assert!(report.success);
        assert_eq!(report.synced, 1);

        let record = engine.store().get("srv_1").await.unwrap().unwrap();
        assert!(record.synced);
        assert_eq!(record.local_id, saved.local_id);
        assert!(engine.store().get(saved.id()).await.unwrap().is_none());
        assert_eq!(api.records().len(), 1);
        assert!(engine.store().list_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pull_inserts_missing_records() {
        let (engine, api) = setup();
        api.insert(server_expense("e1", "2024-02-01T00:00:00.000Z", 10.0));

        let report = engine.sync_all().await;
        assert_eq!(report.pulled, 1);

        let record = engine.store().get("e1").await.unwrap().unwrap();
        assert!(record.synced);
        assert!(!record.created_offline);
        assert!(engine
            .store()
            .last_sync_time()
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn pull_keeps_newer_synced_local() {
        let (engine, api) = setup();
        engine
            .store()
            .put(OfflineExpense::from_server(server_expense(
                "e1",
                "2024-03-01T00:00:00.000Z",
                10.0,
            )))
            .await
            .unwrap();
        api.insert(server_expense("e1", "2024-02-01T00:00:00.000Z", 99.0));

        engine.sync_all().await;
        let record = engine.store().get("e1").await.unwrap().unwrap();
        assert_eq!(record.expense.amount, 10.0);
    }

    #[tokio::test]
    async fn pull_follows_pages() {
        let api = Arc::new(MockExpenseApi::new());
        for i in 0..5 {
            api.insert(server_expense(&format!("e{i}"), "2024-02-01T00:00:00.000Z", 1.0));
        }
        let engine = SyncEngine::new(
            Arc::new(OfflineStore::in_memory()),
            api.clone(),
            SyncConfig::default().with_pull_page_size(2),
        );

        let report = engine.sync_all().await;
        assert_eq!(report.pulled, 5);
        let lists = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::List(_)))
            .count();
        assert_eq!(lists, 3);
    }

    #[tokio::test]
    async fn pull_failure_does_not_stop_push() {
        let (engine, api) = setup();
        engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(5.0))
            .await
            .unwrap();
        api.fail_pulls(Some(MockFailure::Network("connection reset".into())));

        let report = engine.sync_all().await;
        assert!(report.success);
        assert_eq!(report.synced, 1);
        assert!(engine.store().last_sync_time().await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_is_counted_and_retried() {
        let (engine, api) = setup();
        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(5.0))
            .await
            .unwrap();
        api.fail_next(MockFailure::Reject("Validation failed".into()), 1);

        let report = engine.sync_all().await;
        assert!(report.success);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].error, "Validation failed");

        let item = engine.store().get_queue_item(saved.id()).await.unwrap().unwrap();
        assert_eq!(item.attempts, 1);
        assert_eq!(item.error.as_deref(), Some("Validation failed"));
        assert!(item.last_attempt.is_some());
        assert!(engine.has_pending_retry(saved.id()));

        // First retry fires after 2s.
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(engine.store().get_queue_item(saved.id()).await.unwrap().is_none());
        assert!(!engine.has_pending_retry(saved.id()));
        assert_eq!(api.records().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_record_after_push() {
        let (engine, api) = setup();
        api.insert(server_expense("e1", "2024-02-01T00:00:00.000Z", 10.0));
        engine.sync_all().await;

        assert_eq!(engine.delete_expense("e1").await.unwrap(), LocalDelete::Queued);
        let report = engine.sync_all().await;
        assert_eq!(report.synced, 1);
        assert!(engine.store().get("e1").await.unwrap().is_none());
        assert!(api.record("e1").is_none());
    }

    #[tokio::test]
    async fn force_sync_revives_evicted_item() {
        let api = Arc::new(MockExpenseApi::new());
        let engine = SyncEngine::new(
            Arc::new(OfflineStore::in_memory()),
            api.clone(),
            SyncConfig::default().with_retry(RetryConfig::new(1)),
        );
        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(5.0))
            .await
            .unwrap();
        api.fail_next(MockFailure::Network("timeout".into()), 1);

        engine.sync_all().await;
        assert!(engine.store().list_queue().await.unwrap().is_empty());
        assert_eq!(engine.store().list_failed().await.unwrap().len(), 1);

        assert!(engine.force_sync_expense(saved.id()).await);
        assert!(engine.store().list_failed().await.unwrap().is_empty());
        assert!(engine.store().get("srv_1").await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn force_sync_needs_connectivity_and_an_item() {
        let (engine, _api) = setup();
        assert!(!engine.force_sync_expense("missing").await);

        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(5.0))
            .await
            .unwrap();
        engine.set_online(false).await;
        assert!(!engine.force_sync_expense(saved.id()).await);
        engine.destroy();
    }

    #[tokio::test]
    async fn resolve_conflict_merge_overlays_local() {
        let (engine, _api) = setup();
        let mut local = OfflineExpense::from_server(server_expense(
            "e1",
            "2024-02-01T00:00:00.000Z",
            10.0,
        ));
        local.expense.description = Some("local note".into());
        local.synced = false;
        local.version = 3;
        engine.store().put(local.clone()).await.unwrap();

        let mut server = server_expense("e1", "2024-03-01T00:00:00.000Z", 20.0);
        server.bill_number = Some("INV-7".into());

        let merged = engine
            .resolve_conflict(&local, &server, ConflictResolution::Merge)
            .await
            .unwrap();
        assert_eq!(merged.version, 4);
        assert!(!merged.synced);
        assert_eq!(merged.expense.amount, 10.0);
        assert_eq!(merged.expense.description.as_deref(), Some("local note"));
        assert_eq!(merged.expense.bill_number.as_deref(), Some("INV-7"));

        let item = engine.store().get_queue_item("e1").await.unwrap().unwrap();
        assert_eq!(item.kind, MutationType::Update);
        assert_eq!(item.attempts, 0);
    }

    #[tokio::test]
    async fn resolve_conflict_server_accepts_remote() {
        let (engine, _api) = setup();
        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_id("e1").with_amount(10.0))
            .await
            .unwrap();
        let server = server_expense("e1", "2024-03-01T00:00:00.000Z", 20.0);

        let record = engine
            .resolve_conflict(&saved, &server, ConflictResolution::Server)
            .await
            .unwrap();
        assert!(record.synced);
        assert_eq!(record.expense.amount, 20.0);
        assert!(engine.store().list_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_errors_resets_items() {
        let (engine, api) = setup();
        let saved = engine
            .store()
            .save_offline(ExpensePatch::new().with_amount(5.0))
            .await
            .unwrap();
        api.fail_next(MockFailure::Reject("nope".into()), 1);
        engine.sync_all().await;
        assert!(engine.status().await.has_errors);

        assert_eq!(engine.clear_errors().await.unwrap(), 1);
        let item = engine.store().get_queue_item(saved.id()).await.unwrap().unwrap();
        assert_eq!(item.attempts, 0);
        assert!(item.error.is_none());
        assert!(!engine.status().await.has_errors);
        engine.destroy();
    }

    #[tokio::test]
    async fn status_listeners_see_cycle() {
        let (engine, _api) = setup();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = engine
            .add_listener(move |status: &SyncStatus| sink.lock().push(status.is_syncing))
            .await;

        engine.sync_all().await;
        assert!(engine.remove_listener(id));

        let seen = seen.lock();
        assert_eq!(seen.first(), Some(&false));
        assert!(seen.contains(&true));
        assert_eq!(seen.last(), Some(&false));
    }
}
