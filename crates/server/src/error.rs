//! Server error types

use thiserror::Error;

/// Errors raised by the RPC surface
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket or file I/O failure
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire message
    #[error(transparent)]
    Protocol(#[from] thalamus_protocol::ProtocolError),

    /// Node runtime failure
    #[error(transparent)]
    Graph(#[from] thalamus_graph::GraphError),

    /// Config tree failure
    #[error(transparent)]
    Observable(#[from] thalamus_observable::ObservableError),

    /// JSON payload failure in node requests or the bridge
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The client opened a stream with the wrong first message
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
