//! Central log ring
//!
//! Memory-only ring of recent log records. `log` ingest and node logging
//! append here; `logout` subscribers tail the live feed. The ring itself is
//! never persisted.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use thalamus_bus::{Channel, QueuePolicy, Subscription};
use thalamus_protocol::{Modality, TextFrame};

/// Records retained in memory
const RING_CAPACITY: usize = 4096;

/// The central log: a bounded ring plus a live fan-out channel
pub struct LogRing {
    ring: RwLock<VecDeque<Arc<TextFrame>>>,
    channel: Channel<TextFrame>,
}

impl LogRing {
    /// An empty ring
    pub fn new() -> Self {
        Self {
            ring: RwLock::new(VecDeque::with_capacity(RING_CAPACITY)),
            channel: Channel::new(QueuePolicy::for_modality(Modality::Text)),
        }
    }

    /// Append a record and fan it out to live subscribers
    pub async fn append(&self, frame: TextFrame) {
        let frame = Arc::new(frame);
        {
            let mut ring = self.ring.write();
            if ring.len() >= RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(Arc::clone(&frame));
        }
        self.channel.publish(frame).await;
    }

    /// Live tail from now on
    pub fn subscribe(&self) -> Subscription<TextFrame> {
        self.channel.subscribe()
    }

    /// Snapshot of retained records, oldest first
    pub fn recent(&self) -> Vec<Arc<TextFrame>> {
        self.ring.read().iter().cloned().collect()
    }

    /// Records currently retained
    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    /// True when nothing has been logged yet
    pub fn is_empty(&self) -> bool {
        self.ring.read().is_empty()
    }

    /// End all live tails
    pub fn close(&self) {
        self.channel.close();
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new()
    }
}
