//! Thalamus Server - the streaming RPC surface
//!
//! Clients connect over TCP, one connection per call. The first message
//! selects the endpoint; the server streams responses until the call
//! completes, the client closes (cancel), the server shuts down, or the
//! source node is destroyed (terminal `Unavailable` in the latter two
//! cases).
//!
//! # Architecture
//!
//! ```text
//! accept loop
//!     │ spawn per connection
//!     ▼
//! handle_connection ──→ unary: reply, close
//!     │
//!     ├──→ server streams: subscribe on the bus, select over
//!     │    {frame queue, client close, shutdown}
//!     ├──→ client streams: log / inject_analog / stim ingest loops
//!     └──→ bidi: node_request_stream, observable_bridge
//! ```
//!
//! Graph binning, the spectrogram STFT, and replay record parsing are plain
//! structs with their own tests; the endpoint loops only move frames.

mod binning;
mod bridge;
mod error;
mod logging;
mod replay;
mod server;
mod spectral;
mod stream;

pub use binning::{BinEvent, GraphBinner};
pub use bridge::BridgeHub;
pub use error::ServerError;
pub use logging::LogRing;
pub use replay::{read_session, write_record, ReplayPayload, ReplayRecord};
pub use server::{Server, ServerConfig, ServerState};
pub use spectral::ChannelStft;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod logging_test;
#[cfg(test)]
mod replay_test;
#[cfg(test)]
mod spectral_test;
