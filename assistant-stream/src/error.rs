//! Streaming errors.

use crate::stream::AssistantStream;
use std::fmt;
use thiserror::Error;

pub use assistant_stream_core::{StreamError, StreamResult};

/// A synchronous producer failed while building its stream.
///
/// The stream is still handed back: it already carries a root `error` chunk
/// and is closed, so it can be forwarded to the consumer as is.
#[derive(Debug, Error)]
#[error("assistant stream producer failed: {error}")]
pub struct CreateStreamError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// The producer's error.
    pub error: E,
    /// The closed stream.
    pub stream: AssistantStream,
}

impl<E> CreateStreamError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// Split into the error and the stream.
    pub fn into_parts(self) -> (E, AssistantStream) {
        (self.error, self.stream)
    }
}
