//! Graph error types

use thiserror::Error;

/// Errors raised by node construction and runtime operations
#[derive(Debug, Error)]
pub enum GraphError {
    /// Mandatory field missing or wrong shape during node construction
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// Operation named a node that does not exist
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// Operation needs a modality the node does not declare
    #[error("node '{node}' has no {modality} output")]
    MissingModality {
        node: String,
        modality: &'static str,
    },

    /// The node type does not implement this operation
    #[error("operation not supported by this node type")]
    NotSupported,

    /// The node is in the Error state; see `last_error`
    #[error("node is in error state: {0}")]
    NodeFailed(String),

    /// Frame-level failure
    #[error(transparent)]
    Protocol(#[from] thalamus_protocol::ProtocolError),

    /// Config tree failure
    #[error(transparent)]
    Observable(#[from] thalamus_observable::ObservableError),
}
