//! Integration tests for the sync engine against the in-memory API.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tapserve_offline::{MutationType, OfflineExpense, OfflineStore};
use tapserve_sync_engine::{
    HttpClient, HttpExpenseApi, HttpResponse, Method, MockExpenseApi, MockFailure,
    NetworkObserver, RetryConfig, SyncConfig, SyncEngine, SyncReport, SyncResult,
};
use tapserve_testkit::prelude::*;

fn setup() -> (Arc<SyncEngine>, Arc<MockExpenseApi>) {
    let api = Arc::new(MockExpenseApi::new());
    let engine = SyncEngine::new(
        Arc::new(OfflineStore::in_memory()),
        api.clone(),
        SyncConfig::default(),
    );
    (engine, api)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn offline_create_then_reconnect() {
    let (engine, api) = setup();
    engine.set_online(false).await;

    let saved = engine.save_expense(new_expense(500.0)).await.unwrap();
    assert!(!saved.synced);
    assert!(saved.created_offline);
    assert_eq!(saved.expense.vendor_id.as_deref(), Some("v1"));

    let queue = engine.store().list_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].kind, MutationType::Create);
    assert_eq!(engine.status().await.pending_count, 1);
    assert_eq!(engine.pending_timers(), 0);

    engine.set_online(true).await;
    assert_eq!(engine.pending_timers(), 1);

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert!(api.records().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = engine.status().await;
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync.is_some());
    assert!(engine.store().list_queue().await.unwrap().is_empty());

    let records = engine.store().list_all(None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].synced);
    assert_eq!(records[0].local_id, saved.local_id);
    assert_eq!(api.records()[0].amount, 500.0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_cycle_returns_immediately() {
    let (engine, api) = setup();
    engine.store().save_offline(new_expense(10.0)).await.unwrap();
    api.set_latency(Some(Duration::from_secs(1)));

    let running = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.sync_all().await })
    };
    while !engine.is_syncing() {
        tokio::task::yield_now().await;
    }

    let started = tokio::time::Instant::now();
    let second = engine.sync_all().await;
    assert_eq!(second, SyncReport::skipped());
    assert_eq!(started.elapsed(), Duration::ZERO);

    let first = running.await.unwrap();
    assert!(first.success);
    assert_eq!(first.synced, 1);
    assert!(!engine.is_syncing());
}

#[tokio::test(start_paused = true)]
async fn update_evicted_after_five_failures() {
    let (engine, api) = setup();
    api.insert(server_expense("e1", 10.0, iso_at(0)));
    engine.sync_all().await;

    engine
        .store()
        .save_offline(tapserve_sync_protocol::ExpensePatch::new().with_id("e1").with_amount(12.0))
        .await
        .unwrap();
    api.fail_always(Some(MockFailure::Network("connection refused".into())));

    let report = engine.sync_all().await;
    assert_eq!(report.failed, 1);
    assert!(engine.has_pending_retry("e1"));

    // Retries fire 2s, 4s, 8s and 16s apart.
    tokio::time::sleep(Duration::from_secs(29)).await;
    let item = engine.store().get_queue_item("e1").await.unwrap().unwrap();
    assert_eq!(item.kind, MutationType::Update);
    assert_eq!(item.attempts, 4);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(engine.store().get_queue_item("e1").await.unwrap().is_none());
    assert!(!engine.has_pending_retry("e1"));

    let record = engine.store().get("e1").await.unwrap().unwrap();
    assert!(!record.synced);
    let error = record.sync_error.unwrap();
    assert!(error.starts_with("Max attempts reached"), "{error}");

    let status = engine.status().await;
    assert!(status.has_errors);
    assert_eq!(status.pending_count, 1);
    assert_eq!(engine.stats().evictions, 1);

    // Nothing retries an evicted mutation on its own.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(api.push_count(), 5);

    api.fail_always(None);
    assert!(engine.force_sync_expense("e1").await);
    assert!(engine.store().get("e1").await.unwrap().unwrap().synced);
    assert!(!engine.status().await.has_errors);
}

#[tokio::test]
async fn newer_server_record_overwrites_synced_local() {
    let (engine, api) = setup();
    let local = OfflineExpense::from_server(server_expense("e2", 10.0, iso_at(10)));
    engine.store().put(local.clone()).await.unwrap();
    api.insert(server_expense("e2", 75.0, iso_at(20)));

    let report = engine.sync_all().await;
    assert_eq!(report.pulled, 1);

    let record = engine.store().get("e2").await.unwrap().unwrap();
    assert!(record.synced);
    assert_eq!(record.expense.amount, 75.0);
    assert_eq!(record.expense.updated_at, iso_at(20));
    assert_eq!(record.local_id, local.local_id);
}

#[tokio::test]
async fn second_cycle_has_nothing_to_push() {
    let (engine, _api) = setup();
    for amount in [10.0, 20.0, 30.0] {
        engine.store().save_offline(new_expense(amount)).await.unwrap();
    }

    let first = engine.sync_all().await;
    assert!(first.success);
    assert_eq!(first.synced, 3);

    let second = engine.sync_all().await;
    assert!(second.success);
    assert_eq!((second.synced, second.failed), (0, 0));
    assert!(second.errors.is_empty());
}

#[tokio::test]
async fn observer_reports_errors_and_clears_them() {
    let (engine, api) = setup();
    let observer = NetworkObserver::new(Arc::clone(&engine));
    engine.store().save_offline(new_expense(10.0)).await.unwrap();
    api.fail_next(MockFailure::Reject("Validation failed".into()), 1);

    let report = observer.sync_now().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].error, "Validation failed");
    assert!(observer.status().await.has_errors);

    observer.clear_errors().await.unwrap();
    let status = observer.status().await;
    assert!(!status.has_errors);
    assert_eq!(status.pending_count, 1);
    engine.destroy();
    assert_eq!(engine.pending_timers(), 0);
}

/// Answers every GET with an empty page and every write with `reply`.
struct FixedReply {
    reply: String,
}

#[async_trait::async_trait]
impl HttpClient for FixedReply {
    async fn send(
        &self,
        method: Method,
        _url: &str,
        _body: Option<Vec<u8>>,
    ) -> SyncResult<HttpResponse> {
        let body = match method {
            Method::Get => r#"{"success":true,"data":{"items":[],"total":0,"page":1,"limit":100}}"#,
            _ => self.reply.as_str(),
        };
        Ok(HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        })
    }
}

#[tokio::test]
async fn partial_update_reply_keeps_local_fields() {
    let reply = format!(
        r#"{{"success":true,"data":{{"id":"e1","amount":12.0,"updatedAt":"{}"}}}}"#,
        iso_at(60)
    );
    let api = HttpExpenseApi::new("http://api.test/v1", FixedReply { reply });
    let engine = SyncEngine::new(
        Arc::new(OfflineStore::in_memory()),
        Arc::new(api),
        SyncConfig::default(),
    );
    engine
        .store()
        .put(OfflineExpense::from_server(server_expense("e1", 10.0, iso_at(0))))
        .await
        .unwrap();
    engine
        .store()
        .save_offline(tapserve_sync_protocol::ExpensePatch::new().with_id("e1").with_amount(12.0))
        .await
        .unwrap();

    let report = engine.sync_all().await;
    assert_eq!(report.synced, 1);

    let record = engine.store().get("e1").await.unwrap().unwrap();
    assert!(record.synced);
    assert_eq!(record.expense.amount, 12.0);
    assert_eq!(record.expense.updated_at, iso_at(60));
    assert_eq!(record.expense.tenant_id, TENANT_ID);
    assert_eq!(record.expense.outlet_id, OUTLET_ID);
    assert_eq!(record.expense.vendor_name, "Fresh Farms");
    assert_eq!(record.expense.created_by, "server");
    assert_eq!(record.expense.expense_date, "2024-05-01");
    engine.destroy();
}

#[tokio::test]
async fn clearing_errors_clears_evicted_items_too() {
    let api = Arc::new(MockExpenseApi::new());
    let engine = SyncEngine::new(
        Arc::new(OfflineStore::in_memory()),
        api.clone(),
        SyncConfig::default().with_retry(RetryConfig::new(1)),
    );
    let observer = NetworkObserver::new(Arc::clone(&engine));
    let saved = engine.store().save_offline(new_expense(10.0)).await.unwrap();
    api.fail_next(MockFailure::Reject("Vendor is required".into()), 1);

    observer.sync_now().await;
    assert!(engine.store().get_queue_item(saved.id()).await.unwrap().is_none());
    assert_eq!(engine.store().list_failed().await.unwrap().len(), 1);
    assert!(observer.status().await.has_errors);

    assert_eq!(observer.clear_errors().await.unwrap(), 1);
    let status = observer.status().await;
    assert!(!status.has_errors);
    assert_eq!(status.pending_count, 1);

    // Still evicted until forced.
    let failed = engine.store().list_failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.is_none());
    assert!(engine.force_sync_expense(saved.id()).await);
    assert!(engine.store().list_failed().await.unwrap().is_empty());
    engine.destroy();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn unsynced_local_is_never_overwritten_by_pull(server in server_expense_strategy(3)) {
        runtime().block_on(async {
            let (engine, api) = setup();
            engine
                .store()
                .save_offline(
                    tapserve_sync_protocol::ExpensePatch::new()
                        .with_id(server.id.clone())
                        .with_amount(1.0),
                )
                .await
                .unwrap();
            api.insert(server.clone());
            api.fail_next(MockFailure::Network("offline".into()), 1);

            engine.sync_all().await;
            let local = engine.store().get(&server.id).await.unwrap().unwrap();
            prop_assert!(!local.synced);
            prop_assert_eq!(local.expense.amount, 1.0);
            engine.destroy();
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn drained_queue_converges_with_server(ops in local_ops_strategy(12)) {
        runtime().block_on(async {
            let (engine, api) = setup();
            let store = engine.store();
            let mut ids: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    LocalOp::Create(amount) => {
                        let saved = store.save_offline(new_expense(amount)).await.unwrap();
                        ids.push(saved.expense.id);
                    }
                    LocalOp::Edit(i, patch) if !ids.is_empty() => {
                        let id = ids[i % ids.len()].clone();
                        if store.get(&id).await.unwrap().is_some() {
                            store.save_offline(patch.with_id(id)).await.unwrap();
                        }
                    }
                    LocalOp::Delete(i) if !ids.is_empty() => {
                        let id = ids[i % ids.len()].clone();
                        if store.get(&id).await.unwrap().is_some() {
                            store.mark_deleted(&id).await.unwrap();
                        }
                    }
                    _ => {}
                }
            }

            let report = engine.sync_all().await;
            prop_assert!(report.success);
            prop_assert_eq!(report.failed, 0);
            prop_assert!(store.list_queue().await.unwrap().is_empty());
            prop_assert!(store.list_unsynced().await.unwrap().is_empty());
            prop_assert_eq!(
                store.list_all(None, None).await.unwrap().len(),
                api.records().len()
            );
            Ok::<(), TestCaseError>(())
        })?;
    }
}
