//! Protocol error types

use thiserror::Error;

/// Errors raised by frame construction and the wire codec
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Analog spans do not partition the sample buffer
    #[error("spans cover {covered} samples but buffer holds {len}")]
    SpanMismatch { covered: usize, len: usize },

    /// Span and sample-interval counts differ
    #[error("{spans} spans but {intervals} sample intervals")]
    IntervalMismatch { spans: usize, intervals: usize },

    /// A span's begin exceeds its end or its end exceeds the buffer
    #[error("span '{name}' [{begin}, {end}) is out of bounds")]
    SpanOutOfBounds { name: String, begin: u32, end: u32 },

    /// Motion segment id outside the body enumeration
    #[error("segment id {0} outside 1..=63")]
    SegmentId(u32),

    /// Message truncated mid-field
    #[error("truncated message: {0}")]
    Truncated(&'static str),

    /// Unknown message tag or enum discriminant
    #[error("invalid wire value: {0}")]
    InvalidValue(String),

    /// Message exceeds the size limit
    #[error("message of {0} bytes exceeds limit")]
    TooLarge(usize),

    /// Payload is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
