//! Keyed, cancellable delayed tasks.
//!
//! At most one task is pending per key. Scheduling under a key that
//! already has a pending task aborts the old one. A task leaves the map
//! when its delay elapses, so a task that is already running is never
//! aborted by a later `schedule` or `cancel`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Runs futures after a delay, one per key.
#[derive(Default)]
pub struct TaskScheduler {
    tasks: Arc<Mutex<HashMap<String, Pending>>>,
    next_generation: AtomicU64,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`, replacing any pending task for `key`.
    ///
    /// Returns false if called outside a Tokio runtime, in which case
    /// nothing is scheduled.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no runtime available, task not scheduled");
            return false;
        };

        let key = key.into();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        let task_key = key.clone();

        let mut guard = self.tasks.lock();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut tasks = tasks.lock();
                if tasks
                    .get(&task_key)
                    .is_some_and(|pending| pending.generation == generation)
                {
                    tasks.remove(&task_key);
                }
            }
            task.await;
        });
        if let Some(previous) = guard.insert(key, Pending { generation, handle }) {
            previous.handle.abort();
        }
        true
    }

    /// Aborts the pending task for `key`. Returns true if there was one.
    pub fn cancel(&self, key: &str) -> bool {
        match self.tasks.lock().remove(key) {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every pending task.
    pub fn cancel_all(&self) {
        for (_, pending) in self.tasks.lock().drain() {
            pending.handle.abort();
        }
    }

    /// Returns true if a task is pending for `key`.
    pub fn is_scheduled(&self, key: &str) -> bool {
        self.tasks.lock().contains_key(key)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("pending", &self.len())
            .finish()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
