//! Node contract - what a node type implements and what it is given
//!
//! A node receives its config subtree, its output channels, and a host
//! handle for upstream lookup and logging. `start`/`stop` are idempotent;
//! `reconfigure` is called for every edit under the subtree and the node
//! decides whether to apply it hot or cycle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use thalamus_bus::{Channel, QueuePolicy};
use thalamus_observable::{Key, ObservableCollection, Value};
use thalamus_protocol::{
    AnalogFrame, ImageFrame, Modality, ModalitySet, MotionFrame, StimDeclaration, TextFrame,
};

use crate::Result;

/// The per-modality output channels of one node
///
/// Every slot owns all five channels regardless of declared modalities;
/// undeclared ones simply never carry frames, which keeps subscription
/// paths uniform.
pub struct NodeOutputs {
    pub analog: Channel<AnalogFrame>,
    pub image: Channel<ImageFrame>,
    pub motion: Channel<MotionFrame>,
    pub text: Channel<TextFrame>,
    pub stim: Channel<StimDeclaration>,
    /// Most recent analog channel layout, as an empty layout frame
    analog_layout: RwLock<Option<AnalogFrame>>,
}

impl NodeOutputs {
    /// Channels with the per-modality overflow policies
    pub fn new() -> Self {
        Self {
            analog: Channel::new(QueuePolicy::for_modality(Modality::Analog)),
            image: Channel::new(QueuePolicy::for_modality(Modality::Image)),
            motion: Channel::new(QueuePolicy::for_modality(Modality::Motion)),
            text: Channel::new(QueuePolicy::for_modality(Modality::Text)),
            stim: Channel::new(QueuePolicy::for_modality(Modality::Stim)),
            analog_layout: RwLock::new(None),
        }
    }

    /// Publish an analog frame, tracking the channel layout
    pub async fn publish_analog(&self, frame: AnalogFrame) {
        {
            let mut layout = self.analog_layout.write();
            let changed = match &*layout {
                Some(previous) => !previous.same_layout(&frame),
                None => true,
            };
            if changed {
                *layout = Some(frame.layout_only());
            }
        }
        self.analog.publish(Arc::new(frame)).await;
    }

    /// The current analog channel layout, if any frame was published
    pub fn analog_layout(&self) -> Option<AnalogFrame> {
        self.analog_layout.read().clone()
    }

    /// Publish a motion frame
    pub async fn publish_motion(&self, frame: MotionFrame) {
        self.motion.publish(Arc::new(frame)).await;
    }

    /// Publish an image frame
    pub async fn publish_image(&self, frame: ImageFrame) {
        self.image.publish(Arc::new(frame)).await;
    }

    /// Publish a text record
    pub async fn publish_text(&self, frame: TextFrame) {
        self.text.publish(Arc::new(frame)).await;
    }

    /// End every subscriber stream on every modality
    pub fn close_all(&self) {
        self.analog.close();
        self.image.close();
        self.motion.close();
        self.text.close();
        self.stim.close();
    }
}

impl Default for NodeOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Services the runtime provides to nodes
pub trait NodeHost: Send + Sync {
    /// Output channels of the named node, by current name
    fn outputs(&self, name: &str) -> Option<Arc<NodeOutputs>>;

    /// Declared modalities of the named node
    fn modalities(&self, name: &str) -> Option<ModalitySet>;

    /// Append a record to the central log
    fn log(&self, text: TextFrame);

    /// Nanoseconds since the runtime started; frame timestamp base
    fn now_ns(&self) -> u64;
}

/// Everything a node constructor receives
pub struct NodeContext {
    /// The node's name at construction time
    pub name: String,
    /// The node's config subtree; live, observed by the runtime
    pub config: ObservableCollection,
    /// The node's own output channels
    pub outputs: Arc<NodeOutputs>,
    /// Runtime services
    pub host: Arc<dyn NodeHost>,
}

/// One running node
///
/// `start` and `stop` must be idempotent. No frames may be produced after
/// `stop` returns.
#[async_trait]
pub trait Node: Send {
    /// Begin producing frames
    async fn start(&mut self) -> Result<()>;

    /// Cease all I/O and side effects
    async fn stop(&mut self) -> Result<()>;

    /// An edit arrived under the node's subtree at `path`
    async fn reconfigure(&mut self, _path: &[Key], _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Free-form control request; payload negotiated by node type
    async fn process(&mut self, _request: serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}

/// Split a comma-joined `Source` field into trimmed, non-empty names
///
/// Ordering of the listed upstreams is ignored by the runtime.
pub fn parse_source_list(source: &str) -> Vec<String> {
    source
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
