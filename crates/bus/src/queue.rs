//! Per-subscriber frame queues
//!
//! Each subscription owns one bounded FIFO. The producer side pushes under
//! the channel's fan-out; the consumer side is a single reader. Overflow
//! behavior is the queue's `QueuePolicy`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

/// Overflow behavior of a subscriber queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Evict the oldest frame and count the drop
    DropOldest(usize),
    /// Block the producer until the consumer frees a slot
    Backpressure(usize),
    /// Never drop, never block
    Unbounded,
}

pub(crate) struct FrameQueue<T> {
    items: Mutex<VecDeque<Arc<T>>>,
    /// Wakes the consumer when an item or close arrives
    available: Notify,
    /// Producer permits for `Backpressure`; one permit per free slot
    space: Option<Semaphore>,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl<T> FrameQueue<T> {
    pub(crate) fn new(policy: QueuePolicy) -> Self {
        let space = match policy {
            QueuePolicy::Backpressure(capacity) => Some(Semaphore::new(capacity)),
            _ => None,
        };
        let capacity = match policy {
            QueuePolicy::DropOldest(capacity) | QueuePolicy::Backpressure(capacity) => capacity,
            QueuePolicy::Unbounded => 0,
        };
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Notify::new(),
            space,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push without blocking; `capacity` only applies to drop-oldest queues
    pub(crate) fn push(&self, frame: Arc<T>, capacity: Option<usize>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut items = self.items.lock();
            if let Some(capacity) = capacity {
                if items.len() >= capacity {
                    items.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            items.push_back(frame);
        }
        self.available.notify_one();
    }

    /// Push, waiting for a free slot (backpressure queues)
    pub(crate) async fn push_wait(&self, frame: Arc<T>) {
        let Some(space) = &self.space else {
            self.push(frame, None);
            return;
        };
        match space.acquire().await {
            Ok(permit) => {
                // The permit travels with the queued frame; pop re-adds it.
                permit.forget();
                self.push(frame, None);
            }
            Err(_) => {
                // Queue closed while waiting; subscriber is gone.
            }
        }
    }

    pub(crate) async fn pop(&self) -> Option<Arc<T>> {
        loop {
            let notified = self.available.notified();
            if let Some(frame) = self.try_pop() {
                return Some(frame);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    fn try_pop(&self) -> Option<Arc<T>> {
        let frame = self.items.lock().pop_front();
        if frame.is_some() {
            if let Some(space) = &self.space {
                space.add_permits(1);
            }
        }
        frame
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(space) = &self.space {
            // Unblock producers waiting on a full queue.
            space.close();
        }
        self.available.notify_waiters();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer handle to one subscriber queue
///
/// Dropping the subscription closes the queue; the channel removes it on the
/// next publish.
pub struct Subscription<T> {
    pub(crate) queue: Arc<FrameQueue<T>>,
}

impl<T> Subscription<T> {
    /// Receive the next frame; `None` once the producer side closed and the
    /// queue drained
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.queue.pop().await
    }

    /// Frames evicted from this queue so far
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.queue.close();
    }
}
