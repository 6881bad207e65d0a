//! Streaming errors.

use thiserror::Error;

/// Errors that can occur while composing an assistant stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The multiplexer was sealed; no more sources or chunks are accepted.
    #[error("Stream is sealed")]
    Sealed,

    /// The multiplexer failed earlier and is closed for good.
    #[error("Stream failed: {0}")]
    Failed(String),

    /// The part was already closed.
    #[error("Part already closed: {0}")]
    PartClosed(&'static str),

    /// The consumer dropped the output stream.
    #[error("Stream consumer went away")]
    Cancelled,

    /// A merged chunk addressed a part that was never started.
    #[error("Path not found: no part started at index {index}")]
    PathNotFound {
        /// The unmapped first path segment.
        index: usize,
    },

    /// A registered source reported a failure.
    #[error("Source error: {0}")]
    Source(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Create from any error.
    pub fn from_err<E: std::fmt::Display>(err: E) -> Self {
        Self::Other(err.to_string())
    }

    /// Create a source failure from any error.
    pub fn from_source<E: std::fmt::Display>(err: E) -> Self {
        Self::Source(err.to_string())
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
