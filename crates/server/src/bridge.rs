//! Observable bridge hub - config replication fan-out
//!
//! One recursive observer on the document root turns every mutation into an
//! `ObservableChange` record and hands it to each connected bridge client's
//! queue. Inbound transactions apply through `apply_change`, which fires
//! local observers (so the runtime reconfigures) but never re-emits to the
//! replication writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use thalamus_bus::IterableQueue;
use thalamus_observable::{Action, ObservableCollection};
use thalamus_protocol::{ObservableAction, ObservableChange, ObservableTransaction};

/// Fans document change records out to connected bridge clients
pub struct BridgeHub {
    queues: Arc<RwLock<Vec<IterableQueue<ObservableTransaction>>>>,
    alive: Arc<AtomicBool>,
}

impl BridgeHub {
    /// Install the hub's observer on the document root
    pub fn new(root: &ObservableCollection) -> Self {
        let queues: Arc<RwLock<Vec<IterableQueue<ObservableTransaction>>>> =
            Arc::new(RwLock::new(Vec::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let sinks = Arc::clone(&queues);
        let liveness = Arc::clone(&alive);
        root.add_recursive_observer_while(
            move |origin, action, key, value| {
                let subscribers = sinks.read();
                if subscribers.is_empty() {
                    return;
                }
                let change = ObservableChange {
                    address: format!("{}{}", origin.address(), key),
                    value: value.to_json().to_string(),
                    action: match action {
                        Action::Set => ObservableAction::Set,
                        Action::Delete => ObservableAction::Delete,
                    },
                };
                let transaction = ObservableTransaction {
                    id: 0,
                    changes: vec![change],
                    acknowledged: 0,
                };
                for queue in subscribers.iter() {
                    let _ = queue.put(transaction.clone());
                }
            },
            move || liveness.load(Ordering::Acquire),
            true,
        );

        Self { queues, alive }
    }

    /// Register a client; the returned queue receives every future change
    pub fn subscribe(&self) -> IterableQueue<ObservableTransaction> {
        let queue = IterableQueue::new();
        self.queues.write().push(queue.clone());
        debug!("bridge client subscribed");
        queue
    }

    /// Remove a client's queue
    pub fn unsubscribe(&self, queue: &IterableQueue<ObservableTransaction>) {
        queue.close();
        let mut queues = self.queues.write();
        queues.retain(|q| !q.is_closed());
        debug!(remaining = queues.len(), "bridge client removed");
    }

    /// Connected clients
    pub fn client_count(&self) -> usize {
        self.queues.read().len()
    }

    /// Detach the observer and end every client queue
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
        for queue in self.queues.write().drain(..) {
            queue.close();
        }
    }
}
