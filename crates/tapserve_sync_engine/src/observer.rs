//! UI-facing view of connectivity and sync activity.

use crate::engine::SyncEngine;
use crate::error::SyncResult;
use crate::state::SyncReport;
use crate::status::{ListenerId, SyncStatus};
use std::sync::Arc;
use tokio::sync::watch;

/// Connectivity and sync status for one UI surface.
///
/// Wraps a shared [`SyncEngine`]. Listeners registered through an observer
/// are removed when it is dropped.
#[derive(Debug)]
pub struct NetworkObserver {
    engine: Arc<SyncEngine>,
    listeners: parking_lot::Mutex<Vec<ListenerId>>,
}

impl NetworkObserver {
    /// Creates an observer over `engine`.
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            listeners: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// The engine behind this observer.
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Current snapshot, recomputed from the store.
    pub async fn status(&self) -> SyncStatus {
        self.engine.status().await
    }

    /// Reports a connectivity change from the platform.
    pub async fn set_online(&self, online: bool) {
        self.engine.set_online(online).await;
    }

    /// Runs a sync cycle now.
    pub async fn sync_now(&self) -> SyncReport {
        self.engine.sync_all().await
    }

    /// Resets attempts and errors on all queued mutations.
    pub async fn clear_errors(&self) -> SyncResult<usize> {
        self.engine.clear_errors().await
    }

    /// Registers a callback; it receives the current snapshot at once.
    pub async fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        let id = self.engine.add_listener(listener).await;
        self.listeners.lock().push(id);
        id
    }

    /// Unregisters a callback.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().retain(|existing| *existing != id);
        self.engine.remove_listener(id)
    }

    /// Receiver for every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.engine.subscribe()
    }
}

impl Drop for NetworkObserver {
    fn drop(&mut self) {
        for id in self.listeners.lock().drain(..) {
            self.engine.remove_listener(id);
        }
    }
}
