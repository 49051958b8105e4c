//! RPC message set
//!
//! Plain data carried by `ClientMessage`/`ServerMessage`. Field semantics are
//! authoritative regardless of wire format; the codec lives in `codec`.

use crate::frame::{AnalogFrame, StimDeclaration};

/// Names one node in the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSelector {
    pub name: String,
}

impl NodeSelector {
    /// Select a node by name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Request for analog data or channel metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalogRequest {
    pub node: NodeSelector,
    /// Empty selects all channels
    pub channel_names: Vec<String>,
}

/// Request a mean-binned view of a node's analog output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphRequest {
    pub node: NodeSelector,
    /// Bin width in nanoseconds
    pub bin_ns: u64,
    /// Empty selects all channels
    pub channel_names: Vec<String>,
}

/// One emission of binned values
///
/// `bins` concatenates per-channel slices; `spans` names the slices. An
/// emission with empty bins marks a channel-layout boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphResponse {
    pub bins: Vec<f64>,
    pub spans: Vec<crate::frame::Span>,
}

/// Request per-channel short-time spectra
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrogramRequest {
    pub node: NodeSelector,
    /// Channel names; empty selects all channels
    pub channels: Vec<String>,
    /// Analysis window length in seconds
    pub window_s: f64,
    /// Hop between windows in seconds
    pub hop_s: f64,
}

/// One channel's spectrum: interleaved re/im pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrogramChannel {
    pub data: Vec<f64>,
    pub max_frequency: f64,
}

/// One emission of per-channel spectra
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrogramResponse {
    pub spectrograms: Vec<SpectrogramChannel>,
}

/// Request an image stream, rate-limited to `framerate`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRequest {
    pub node: NodeSelector,
    /// Frames per second; 0 delivers every frame
    pub framerate: f64,
}

/// One message of the analog injection stream
///
/// The first message names the target node; every following message carries a
/// signal frame that appears on that node's analog output.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectAnalogRequest {
    Node(String),
    Signal(AnalogFrame),
}

/// One message of the stim stream
///
/// The first message names the node; `InlineArm` stores a declaration and
/// `Trigger` plays the most recently armed declaration exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum StimRequest {
    Node(NodeSelector),
    InlineArm(StimDeclaration),
    Trigger(u32),
}

/// Free-form per-node control request; payload is JSON negotiated by node type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRequest {
    pub node: String,
    pub json: String,
}

/// Free-form per-node control response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeResponse {
    pub json: String,
}

/// Replay selected nodes from a recorded session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayRequest {
    pub filename: String,
    pub nodes: Vec<String>,
}

/// Kind of configuration mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ObservableAction {
    #[default]
    Set = 0,
    Delete = 1,
}

impl ObservableAction {
    /// Wire discriminant
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire discriminant
    pub fn from_u8(value: u8) -> Option<ObservableAction> {
        match value {
            0 => Some(ObservableAction::Set),
            1 => Some(ObservableAction::Delete),
            _ => None,
        }
    }
}

/// One configuration change record
///
/// `address` is the bracketed path from the document root, e.g.
/// `['nodes'][0]['Running']`; `value` is JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableChange {
    pub address: String,
    pub value: String,
    pub action: ObservableAction,
}

/// A batch of configuration changes, acknowledged by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableTransaction {
    /// Sender-assigned id, echoed in `acknowledged`
    pub id: u64,
    pub changes: Vec<ObservableChange>,
    /// Nonzero when this transaction acknowledges a peer transaction
    pub acknowledged: u64,
}
