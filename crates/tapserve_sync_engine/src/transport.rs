//! The expenses API the engine talks to.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tapserve_sync_protocol::{
    now_iso, ApiResponse, Expense, ExpenseFilters, ExpensePage, ExpensePatch,
};

/// Remote expenses API.
///
/// Implementations own the transport details (base URL, headers). A
/// request that never completes is an `Err`; a request the server refused
/// is `Ok` with `success: false`.
///
/// Create and update replies are patches: a field the server left out of
/// its reply is `None` and must not overwrite the local value.
#[async_trait]
pub trait ExpenseApi: Send + Sync {
    /// `GET /expenses`.
    async fn get_expenses(&self, filters: &ExpenseFilters) -> SyncResult<ApiResponse<ExpensePage>>;

    /// `POST /expenses`.
    async fn create_expense(&self, expense: &Expense) -> SyncResult<ApiResponse<ExpensePatch>>;

    /// `PUT /expenses/:id`.
    async fn update_expense(
        &self,
        id: &str,
        expense: &Expense,
    ) -> SyncResult<ApiResponse<ExpensePatch>>;

    /// `DELETE /expenses/:id`.
    async fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>>;
}

/// A scripted failure for [`MockExpenseApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// The request never completes.
    Network(String),
    /// The server answers `success: false`.
    Reject(String),
}

/// One recorded call on [`MockExpenseApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// A list request.
    List(ExpenseFilters),
    /// A create for this (local) id.
    Create(String),
    /// An update.
    Update(String),
    /// A delete.
    Delete(String),
}

#[derive(Debug, Default)]
struct MockState {
    records: BTreeMap<String, Expense>,
    next_id: u64,
    scripted: VecDeque<MockFailure>,
    persistent: Option<MockFailure>,
    pull_failure: Option<MockFailure>,
    calls: Vec<MockCall>,
}

/// An in-memory expenses server for tests and offline demos.
///
/// Assigns `srv_<n>` ids on create, filters `startDate` against
/// `updatedAt` and honours `page`/`limit`. Push failures can be scripted
/// per call; pull failures and blanket failures are switched on and off.
#[derive(Debug, Default)]
pub struct MockExpenseApi {
    state: Mutex<MockState>,
    latency: Mutex<Option<Duration>>,
}

impl MockExpenseApi {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as if another client had created it.
    pub fn insert(&self, expense: Expense) {
        let mut state = self.state.lock();
        state.records.insert(expense.id.clone(), expense);
    }

    /// Returns a server-side record.
    pub fn record(&self, id: &str) -> Option<Expense> {
        self.state.lock().records.get(id).cloned()
    }

    /// Returns all server-side records.
    pub fn records(&self) -> Vec<Expense> {
        self.state.lock().records.values().cloned().collect()
    }

    /// Fails the next pushes (create, update, delete) in order, one
    /// scripted failure per call.
    pub fn fail_next(&self, failure: MockFailure, times: usize) {
        let mut state = self.state.lock();
        for _ in 0..times {
            state.scripted.push_back(failure.clone());
        }
    }

    /// Fails every call until cleared with `None`.
    pub fn fail_always(&self, failure: Option<MockFailure>) {
        self.state.lock().persistent = failure;
    }

    /// Fails every list call until cleared with `None`.
    pub fn fail_pulls(&self, failure: Option<MockFailure>) {
        self.state.lock().pull_failure = failure;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of mutating calls received so far.
    pub fn push_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, MockCall::List(_)))
            .count()
    }

    async fn begin(&self, call: MockCall) -> Option<MockFailure> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        let failure = match call {
            MockCall::List(_) => state.pull_failure.clone(),
            _ => state.scripted.pop_front(),
        };
        state.calls.push(call);
        failure.or_else(|| state.persistent.clone())
    }
}

fn fail<T>(failure: MockFailure) -> SyncResult<ApiResponse<T>> {
    match failure {
        MockFailure::Network(message) => Err(SyncError::transport_retryable(message)),
        MockFailure::Reject(message) => Ok(ApiResponse::failure(message)),
    }
}

#[async_trait]
impl ExpenseApi for MockExpenseApi {
    async fn get_expenses(&self, filters: &ExpenseFilters) -> SyncResult<ApiResponse<ExpensePage>> {
        if let Some(failure) = self.begin(MockCall::List(filters.clone())).await {
            return fail(failure);
        }
        let state = self.state.lock();
        let matching: Vec<_> = state
            .records
            .values()
            .filter(|e| {
                filters
                    .start_date
                    .as_ref()
                    .map_or(true, |since| e.updated_at.as_str() >= since.as_str())
            })
            .filter(|e| filters.tenant_id.as_ref().map_or(true, |t| &e.tenant_id == t))
            .filter(|e| filters.outlet_id.as_ref().map_or(true, |o| &e.outlet_id == o))
            .cloned()
            .collect();

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(10).max(1);
        let start = ((page - 1) * limit) as usize;
        let items = matching
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ApiResponse::ok(ExpensePage {
            items,
            total: matching.len() as u64,
            page,
            limit,
        }))
    }

    async fn create_expense(&self, expense: &Expense) -> SyncResult<ApiResponse<ExpensePatch>> {
        if let Some(failure) = self.begin(MockCall::Create(expense.id.clone())).await {
            return fail(failure);
        }
        let mut state = self.state.lock();
        state.next_id += 1;
        let now = now_iso();
        let mut created = expense.clone();
        created.id = format!("srv_{}", state.next_id);
        created.created_at = now.clone();
        created.updated_at = now;
        state.records.insert(created.id.clone(), created.clone());
        Ok(ApiResponse::ok(created.into()))
    }

    async fn update_expense(
        &self,
        id: &str,
        expense: &Expense,
    ) -> SyncResult<ApiResponse<ExpensePatch>> {
        if let Some(failure) = self.begin(MockCall::Update(id.to_string())).await {
            return fail(failure);
        }
        let mut state = self.state.lock();
        let Some(existing) = state.records.get_mut(id) else {
            return Ok(ApiResponse::failure("Expense not found"));
        };
        let created_at = existing.created_at.clone();
        *existing = expense.clone();
        existing.id = id.to_string();
        existing.created_at = created_at;
        existing.updated_at = now_iso();
        Ok(ApiResponse::ok(ExpensePatch::from(&*existing)))
    }

    async fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>> {
        if let Some(failure) = self.begin(MockCall::Delete(id.to_string())).await {
            return fail(failure);
        }
        let mut state = self.state.lock();
        if state.records.remove(id).is_none() {
            return Ok(ApiResponse::failure("Expense not found"));
        }
        Ok(ApiResponse::empty())
    }
}
