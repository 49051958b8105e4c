//! Bus error types

use thiserror::Error;

/// Bus errors
#[derive(Debug, Error)]
pub enum BusError {
    /// The channel or queue has been closed
    #[error("channel closed")]
    Closed,

    /// A stim queue overflowed; fatal to the stim stream
    #[error("stim queue overflow")]
    StimOverflow,
}
