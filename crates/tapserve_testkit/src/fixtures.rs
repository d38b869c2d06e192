//! Test fixtures and store helpers.

use chrono::{Duration, TimeZone, Utc};
use std::path::PathBuf;
use tapserve_offline::{OfflineStore, StoreConfig};
use tapserve_sync_protocol::{format_iso, Expense, ExpensePatch, ExpenseStatus};
use tempfile::TempDir;

/// Tenant used by fixtures.
pub const TENANT_ID: &str = "tenant-1";

/// Outlet used by fixtures.
pub const OUTLET_ID: &str = "outlet-1";

/// A timestamp `offset_secs` after 2024-05-01T00:00:00Z, in the canonical
/// ISO form.
pub fn iso_at(offset_secs: i64) -> String {
    let base = Utc
        .with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    format_iso(base + Duration::seconds(offset_secs))
}

/// A new-expense patch booked against the fixture tenant and outlet.
pub fn new_expense(amount: f64) -> ExpensePatch {
    ExpensePatch::new()
        .with_scope(TENANT_ID, OUTLET_ID)
        .with_amount(amount)
        .with_vendor("v1", "Fresh Farms")
        .with_category("c1", "Produce")
        .with_expense_date("2024-05-01")
}

/// A server-side record last modified at `updated_at`.
pub fn server_expense(id: &str, amount: f64, updated_at: impl Into<String>) -> Expense {
    Expense {
        id: id.to_string(),
        tenant_id: TENANT_ID.into(),
        outlet_id: OUTLET_ID.into(),
        amount,
        expense_date: "2024-05-01".into(),
        vendor_id: Some("v1".into()),
        vendor_name: "Fresh Farms".into(),
        category_id: "c1".into(),
        category_name: "Produce".into(),
        status: ExpenseStatus::Pending,
        created_by: "server".into(),
        created_at: iso_at(0),
        updated_at: updated_at.into(),
        ..Default::default()
    }
}

/// An offline store with automatic cleanup.
pub struct TestStore {
    /// The store.
    pub store: OfflineStore,
    path: Option<PathBuf>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// An in-memory store.
    pub fn memory() -> Self {
        Self {
            store: OfflineStore::in_memory(),
            path: None,
            _temp_dir: None,
        }
    }

    /// A file-backed store in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(StoreConfig::default())
    }

    /// A file-backed store with `config`.
    pub fn file_with_config(config: StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("offline.journal");
        Self {
            store: OfflineStore::open_file(&path, config),
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Journal path if file-backed.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Drops the store and opens the same journal again.
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self) -> Self {
        let path = self.path.clone().expect("only file stores can be reopened");
        let temp_dir = self._temp_dir;
        drop(self.store);
        Self {
            store: OfflineStore::open_file(&path, StoreConfig::default()),
            path: Some(path),
            _temp_dir: temp_dir,
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = OfflineStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
