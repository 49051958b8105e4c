//! Channel - the broadcast point for one (node, modality) pair
//!
//! `Channel` is the integration point between node producer tasks and
//! subscriber queues. It provides:
//!
//! - Zero cost when no subscribers (inline flag check)
//! - `Arc` frame fan-out, one clone of the handle per subscriber
//! - Automatic cleanup of closed subscriber queues
//! - Clean termination: closing the channel ends every subscriber stream

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::queue::{FrameQueue, QueuePolicy, Subscription};

/// Broadcast channel for one modality of one node
pub struct Channel<T> {
    subscribers: RwLock<Vec<Arc<FrameQueue<T>>>>,
    policy: QueuePolicy,
    /// Quick check flag for the publish hot path
    has_subscribers: AtomicBool,
    closed: AtomicBool,
    published: AtomicU64,
}

impl<T> Channel<T> {
    /// Create a channel whose subscriber queues follow `policy`
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            policy,
            has_subscribers: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            published: AtomicU64::new(0),
        }
    }

    /// Publish a frame to every live subscriber
    ///
    /// Suspends only when a backpressure queue is full; drop-oldest and
    /// unbounded queues never block the producer.
    pub async fn publish(&self, frame: Arc<T>) {
        // Fast path: no subscribers = no work
        if !self.has_subscribers.load(Ordering::Relaxed) {
            return;
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<Arc<FrameQueue<T>>> = self.subscribers.read().clone();
        let mut saw_closed = false;
        for queue in &snapshot {
            if queue.is_closed() {
                saw_closed = true;
                continue;
            }
            match self.policy {
                QueuePolicy::DropOldest(capacity) => queue.push(Arc::clone(&frame), Some(capacity)),
                QueuePolicy::Unbounded => queue.push(Arc::clone(&frame), None),
                QueuePolicy::Backpressure(_) => queue.push_wait(Arc::clone(&frame)).await,
            }
        }

        if saw_closed {
            self.cleanup();
        }
    }

    /// Subscribe, obtaining a queue drained on the caller's schedule
    ///
    /// Subscribing to a closed channel yields a subscription that ends
    /// immediately.
    pub fn subscribe(&self) -> Subscription<T> {
        let queue = Arc::new(FrameQueue::new(self.policy));
        if self.closed.load(Ordering::Acquire) {
            queue.close();
            return Subscription { queue };
        }
        self.subscribers.write().push(Arc::clone(&queue));
        self.has_subscribers.store(true, Ordering::Relaxed);
        trace!("new bus subscriber");
        Subscription { queue }
    }

    /// Close the channel; every subscriber stream ends after draining
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let subscribers = std::mem::take(&mut *self.subscribers.write());
        for queue in subscribers {
            queue.close();
        }
        self.has_subscribers.store(false, Ordering::Relaxed);
    }

    /// Remove queues whose consumer went away
    fn cleanup(&self) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|queue| !queue.is_closed());
        if subscribers.is_empty() {
            self.has_subscribers.store(false, Ordering::Relaxed);
        }
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Fan-out statistics
    pub fn stats(&self) -> ChannelStats {
        let subscribers = self.subscribers.read();
        ChannelStats {
            published: self.published.load(Ordering::Relaxed),
            subscriber_count: subscribers.len(),
            dropped: subscribers.iter().map(|q| q.dropped()).sum(),
        }
    }
}

/// Statistics about one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames published while at least one subscriber existed
    pub published: u64,
    /// Live subscriber queues
    pub subscriber_count: usize,
    /// Frames evicted across all drop-oldest queues
    pub dropped: u64,
}
