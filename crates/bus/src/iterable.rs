//! IterableQueue - async FIFO with an explicit end-of-stream
//!
//! A producer `put`s items and eventually `close`s; the consumer calls
//! `next` until it returns `None`. Each delivered item is acknowledged
//! internally so `join` can await a full drain. Cancelling a pending `next`
//! never loses an item: the item stays queued for the next call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::BusError;
use crate::Result;

/// Async FIFO with close-to-end semantics
///
/// Cloning the handle shares the queue; any clone may produce or consume.
pub struct IterableQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
    drained: Notify,
    closed: AtomicBool,
}

impl<T> IterableQueue<T> {
    /// An empty open queue
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                items: Mutex::new(VecDeque::new()),
                available: Notify::new(),
                drained: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue an item; fails once the queue is closed
    pub fn put(&self, item: T) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        self.shared.items.lock().push_back(item);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Convert the producer's end into end-of-stream on the consumer side
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.available.notify_waiters();
        if self.shared.items.lock().is_empty() {
            self.shared.drained.notify_waiters();
        }
    }

    /// Next item; `None` after `close` once the queue drained
    pub async fn next(&self) -> Option<T> {
        loop {
            let notified = self.shared.available.notified();
            {
                let mut items = self.shared.items.lock();
                if let Some(item) = items.pop_front() {
                    if items.is_empty() {
                        self.shared.drained.notify_waiters();
                    }
                    return Some(item);
                }
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Wait until every enqueued item has been delivered
    pub async fn join(&self) {
        loop {
            let notified = self.shared.drained.notified();
            if self.shared.items.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// True once `close` was called
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<T> Clone for IterableQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for IterableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
