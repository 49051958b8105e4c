//! Thalamus Bus - in-process frame fan-out
//!
//! Every node owns one broadcast `Channel` per modality it supports.
//! Producers publish `Arc`-wrapped frames; each subscriber owns a bounded
//! FIFO queue drained on its own schedule.
//!
//! # Architecture
//!
//! ```text
//! node producer task
//!     │ publish(Arc<Frame>)
//!     ▼
//! Channel ── per-channel lock for the moment of fan-out
//!     ├──→ Subscription queue (RPC stream handler)
//!     ├──→ Subscription queue (derived node)
//!     └──→ Subscription queue (recorder)
//! ```
//!
//! # Overflow policy
//!
//! Policy is fixed per modality: image and motion queues drop their oldest
//! frame and count the drop; analog and text queues briefly block the
//! producer instead, so delivery on those modalities is loss-free; stim
//! queues are unbounded because armed declarations must never be lost.
//!
//! Ordering: within one (producer, subscriber) pair frames arrive in
//! production order. Nothing is promised across nodes or modalities.

mod channel;
mod error;
mod iterable;
mod queue;

pub use channel::{Channel, ChannelStats};
pub use error::BusError;
pub use iterable::IterableQueue;
pub use queue::{QueuePolicy, Subscription};

use thalamus_protocol::Modality;

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, BusError>;

/// Analog subscriber queue capacity in frames
///
/// Sources emit analog frames on a tens-of-milliseconds cadence, so this
/// holds well over the guaranteed 200 ms of data at nominal rates.
pub const ANALOG_QUEUE_CAPACITY: usize = 1024;

/// Image subscriber queue capacity in frames
pub const IMAGE_QUEUE_CAPACITY: usize = 4;

/// Motion subscriber queue capacity in frames
pub const MOTION_QUEUE_CAPACITY: usize = 8;

/// Text subscriber queue capacity in records
pub const TEXT_QUEUE_CAPACITY: usize = 1024;

impl QueuePolicy {
    /// The fixed overflow policy for a modality
    pub fn for_modality(modality: Modality) -> QueuePolicy {
        match modality {
            Modality::Analog => QueuePolicy::Backpressure(ANALOG_QUEUE_CAPACITY),
            Modality::Image => QueuePolicy::DropOldest(IMAGE_QUEUE_CAPACITY),
            Modality::Motion => QueuePolicy::DropOldest(MOTION_QUEUE_CAPACITY),
            Modality::Text => QueuePolicy::Backpressure(TEXT_QUEUE_CAPACITY),
            Modality::Stim => QueuePolicy::Unbounded,
        }
    }
}

// Test modules - only compiled during testing
#[cfg(test)]
mod channel_test;
#[cfg(test)]
mod iterable_test;
#[cfg(test)]
mod queue_test;
