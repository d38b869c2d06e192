//! Connectivity and sync status fan-out.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot shown to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Device connectivity.
    pub is_online: bool,
    /// A sync cycle is running.
    pub is_syncing: bool,
    /// End of the last sync cycle.
    pub last_sync: Option<String>,
    /// Records not yet accepted by the server.
    pub pending_count: usize,
    /// Some mutation has a recorded failure.
    pub has_errors: bool,
}

/// Handle returned by [`StatusBroadcaster::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Status callback.
pub type StatusListener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Publishes [`SyncStatus`] snapshots to callbacks and watch receivers.
pub struct StatusBroadcaster {
    listeners: Mutex<Vec<(ListenerId, StatusListener)>>,
    next_id: AtomicU64,
    sender: watch::Sender<SyncStatus>,
}

impl StatusBroadcaster {
    /// Creates a broadcaster holding `initial`.
    pub fn new(initial: SyncStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    /// Registers a callback and calls it once with the current snapshot.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: StatusListener = Arc::new(listener);
        self.listeners.lock().push((id, Arc::clone(&listener)));
        listener(&self.current());
        id
    }

    /// Unregisters a callback. Returns true if it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Stores `status` and hands it to every listener.
    pub fn publish(&self, status: SyncStatus) {
        self.sender.send_replace(status.clone());
        let listeners: Vec<StatusListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&status);
        }
    }

    /// Last published snapshot.
    pub fn current(&self) -> SyncStatus {
        self.sender.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.sender.subscribe()
    }

    /// Number of registered callbacks.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Drops all callbacks.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new(SyncStatus::default())
    }
}

impl std::fmt::Debug for StatusBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBroadcaster")
            .field("current", &self.current())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
