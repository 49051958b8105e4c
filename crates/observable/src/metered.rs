//! Metered updater - rate-limited write coalescing
//!
//! High-rate producers (node status, live counters) must not flood the
//! configuration tree with writes. The metered updater coalesces writes per
//! key and flushes only the last value per key once per interval, while a
//! liveness predicate holds.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::collection::{ObservableCollection, Value};

/// Rate-limited write coalescer over an observable map
///
/// `set` may be called from any task at any rate; the underlying collection
/// sees at most one write per key per interval, always the latest value.
/// The flush task stops once the liveness predicate returns false.
pub struct MeteredUpdater {
    pending: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    task: JoinHandle<()>,
}

impl MeteredUpdater {
    /// Start flushing `target` every `interval` while `is_alive` holds
    pub fn new(
        target: ObservableCollection,
        interval: Duration,
        is_alive: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        let pending: Arc<Mutex<Vec<(String, serde_json::Value)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let flush_queue = Arc::clone(&pending);

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                if !is_alive() {
                    break;
                }
                let updates: Vec<(String, serde_json::Value)> =
                    std::mem::take(&mut *flush_queue.lock());
                for (key, value) in updates {
                    if let Err(e) = target.set(key.clone(), Value::from_json(&value)) {
                        warn!(key, error = %e, "metered update failed");
                    }
                }
            }
        });

        Self { pending, task }
    }

    /// Record a write; only the last value per key survives to the flush
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        let mut pending = self.pending.lock();
        if let Some(position) = pending.iter().position(|(k, _)| *k == key) {
            pending.remove(position);
        }
        pending.push((key, value));
    }
}

impl Drop for MeteredUpdater {
    fn drop(&mut self) {
        self.task.abort();
    }
}
