//! Thalamus Protocol - Typed frames and the wire format
//!
//! This crate provides the payload types that flow through the pipeline and
//! the message set exchanged over the RPC surface:
//! - `AnalogFrame`, `ImageFrame`, `MotionFrame`, `TextFrame`, `StimDeclaration`
//!   - the per-modality frame types published on the stream bus
//! - `Span` - a named contiguous slice of an analog buffer, one per channel
//! - `Modality` / `ModalitySet` - what a node may emit or consume
//! - `ClientMessage` / `ServerMessage` - the RPC message set with a
//!   length-prefixed binary codec
//!
//! # Design Principles
//!
//! - **Zero-copy image planes**: image data uses `bytes::Bytes` so fan-out to
//!   multiple subscribers never copies pixel data
//! - **Invariants at construction**: an `AnalogFrame` cannot exist unless its
//!   spans partition the sample buffer and every span has a sample interval
//! - **Client-agnostic wire format**: simple length-prefixed binary framing,
//!   not a Rust-specific serialization

mod codec;
mod error;
mod frame;
mod message;
mod modality;

pub use codec::{read_length_prefix, ClientMessage, ServerMessage};
pub use error::ProtocolError;
pub use frame::{
    segment_name, AnalogFrame, ChannelType, ImageFormat, ImageFrame, MotionFrame, Segment, Span,
    StimDeclaration, TextFrame, SEGMENT_ID_MAX,
};
pub use message::{
    AnalogRequest, GraphRequest, GraphResponse, ImageRequest, InjectAnalogRequest, NodeRequest,
    NodeResponse, NodeSelector, ObservableAction, ObservableChange, ObservableTransaction,
    ReplayRequest, SpectrogramChannel, SpectrogramRequest, SpectrogramResponse, StimRequest,
};pub use modality::{Modality, ModalitySet};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Largest message the codec will accept, in bytes (64 MiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

#[cfg(test)]
mod frame_test;
