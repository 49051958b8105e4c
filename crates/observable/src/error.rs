//! Observable tree error types

use thiserror::Error;

/// Errors raised by tree mutation, addressing, and the document layer
#[derive(Debug, Error)]
pub enum ObservableError {
    /// A collection already attached elsewhere was inserted again
    #[error("collection is already attached to a parent")]
    AlreadyAttached,

    /// A map operation hit a sequence or scalar
    #[error("collection is not a map")]
    NotAMap,

    /// A sequence operation hit a map or scalar
    #[error("collection is not a sequence")]
    NotASeq,

    /// Sequence index outside the current length
    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Address string failed to parse
    #[error("malformed address '{0}'")]
    AddressParse(String),

    /// Address named a path that does not exist in the tree
    #[error("address '{0}' does not resolve")]
    AddressResolve(String),

    /// The document root or a merge source had the wrong JSON shape
    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    /// Document file I/O failure
    #[error("document I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Document JSON parse failure
    #[error("document JSON: {0}")]
    Json(#[from] serde_json::Error),
}
