//! Integration tests for the offline store.

use proptest::prelude::*;
use std::collections::HashSet;
use tapserve_offline::{
    LocalDelete, MutationType, OfflineExpense, OfflineStore, StoreConfig, StoreError,
};
use tapserve_sync_protocol::{Expense, ExpensePatch};
use tempfile::tempdir;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Create(f64),
    Edit(usize, f64),
    Delete(usize),
    Synced(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1.0f64..1000.0).prop_map(Op::Create),
        (0usize..8, 1.0f64..1000.0).prop_map(|(i, a)| Op::Edit(i, a)),
        (0usize..8).prop_map(Op::Delete),
        (0usize..8).prop_map(Op::Synced),
    ]
}

async fn apply(store: &OfflineStore, ids: &mut Vec<String>, op: Op) {
    match op {
        Op::Create(amount) => {
            let saved = store
                .save_offline(ExpensePatch::new().with_amount(amount))
                .await
                .unwrap();
            ids.push(saved.expense.id);
        }
        Op::Edit(i, amount) if !ids.is_empty() => {
            let id = ids[i % ids.len()].clone();
            if store.get(&id).await.unwrap().is_some() {
                store
                    .save_offline(ExpensePatch::new().with_id(id).with_amount(amount))
                    .await
                    .unwrap();
            }
        }
        Op::Delete(i) if !ids.is_empty() => {
            let id = ids[i % ids.len()].clone();
            match store.mark_deleted(&id).await {
                Ok(_) | Err(StoreError::NotFound(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        Op::Synced(i) if !ids.is_empty() => {
            let id = ids[i % ids.len()].clone();
            let Some(item) = store.get_queue_item(&id).await.unwrap() else {
                return;
            };
            if item.kind == MutationType::Delete {
                store.delete(&id).await.unwrap();
            } else {
                store.mark_synced(&id, None).await.unwrap();
            }
        }
        _ => {}
    }
}

async fn check_invariants(store: &OfflineStore) -> Result<(), TestCaseError> {
    let queue = store.list_queue().await.unwrap();
    let queued: HashSet<_> = queue.iter().map(|i| i.id.clone()).collect();
    prop_assert_eq!(queued.len(), queue.len(), "duplicate queue item");

    let unsynced: HashSet<_> = store
        .list_unsynced()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.expense.id)
        .collect();
    prop_assert_eq!(unsynced, queued);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn queue_holds_one_item_per_unsynced_record(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let store = OfflineStore::in_memory();
            let mut ids = Vec::new();
            for op in ops {
                apply(&store, &mut ids, op).await;
                check_invariants(&store).await?;
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("offline.journal");

    let id = {
        let store = OfflineStore::open_file(&path, StoreConfig::default());
        let saved = store
            .save_offline(ExpensePatch::new().with_amount(500.0).with_vendor("v1", "Fresh Farms"))
            .await
            .unwrap();
        saved.expense.id
    };

    let store = OfflineStore::open_file(&path, StoreConfig::default());
    let record = store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.expense.vendor_id.as_deref(), Some("v1"));
    assert!(!record.synced);
    assert_eq!(store.list_queue().await.unwrap()[0].kind, MutationType::Create);
}

#[tokio::test]
async fn second_process_sees_storage_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("offline.journal");

    let first = OfflineStore::open_file(&path, StoreConfig::default());
    first.open().await.unwrap();

    let second = OfflineStore::open_file(&path, StoreConfig::default());
    let err = second.storage_stats().await.unwrap_err();
    assert!(err.is_unavailable());

    drop(first);
    assert_eq!(second.storage_stats().await.unwrap().total_expenses, 0);
}

#[tokio::test]
async fn delete_of_pulled_record_waits_for_push() {
    let store = OfflineStore::in_memory();
    store
        .put(OfflineExpense::from_server(Expense {
            id: "e9".into(),
            amount: 12.0,
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(store.mark_deleted("e9").await.unwrap(), LocalDelete::Queued);
    assert!(store.get("e9").await.unwrap().is_some());
    assert_eq!(store.storage_stats().await.unwrap().unsynced_expenses, 1);

    store.delete("e9").await.unwrap();
    assert_eq!(store.storage_stats().await.unwrap().total_expenses, 0);
}
