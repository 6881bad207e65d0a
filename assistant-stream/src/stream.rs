//! The assistant stream type.

use assistant_stream_core::{Chunk, StreamResult};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, TryStreamExt};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A consumable sequence of chunks.
    ///
    /// Produced by the stream entry points and accepted by
    /// [`AssistantStreamController::merge`](crate::AssistantStreamController::merge).
    pub struct AssistantStream {
        #[pin]
        inner: BoxStream<'static, StreamResult<Chunk>>,
    }
}

impl AssistantStream {
    /// Wrap any chunk stream.
    pub fn from_stream<S>(inner: S) -> Self
    where
        S: Stream<Item = StreamResult<Chunk>> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
        }
    }

    /// A stream yielding the given chunks, then ending.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let chunks: Vec<StreamResult<Chunk>> = chunks.into_iter().map(Ok).collect();
        Self::from_stream(stream::iter(chunks))
    }

    /// Drain the stream.
    ///
    /// # Errors
    ///
    /// Returns the first error item; chunks before it are discarded.
    pub async fn collect_chunks(self) -> StreamResult<Vec<Chunk>> {
        self.inner.try_collect().await
    }

    /// Unwrap the boxed inner stream.
    #[must_use]
    pub fn into_inner(self) -> BoxStream<'static, StreamResult<Chunk>> {
        self.inner
    }
}

impl std::fmt::Debug for AssistantStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantStream").finish_non_exhaustive()
    }
}

impl Stream for AssistantStream {
    type Item = StreamResult<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_stream_core::{PartInit, StreamError};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_from_chunks() {
        let chunks = vec![
            Chunk::part_start(PartInit::text()),
            Chunk::text_delta("hi").at(vec![0]),
        ];
        let stream = AssistantStream::from_chunks(chunks.clone());
        assert_eq!(stream.collect_chunks().await.unwrap(), chunks);
    }

    #[tokio::test]
    async fn test_collect_surfaces_error() {
        let stream = AssistantStream::from_stream(stream::iter(vec![
            Ok(Chunk::part_finish()),
            Err(StreamError::from_source("boom")),
        ]));
        assert!(matches!(
            stream.collect_chunks().await,
            Err(StreamError::Source(_))
        ));
    }

    #[tokio::test]
    async fn test_into_inner() {
        let mut inner = AssistantStream::from_chunks(vec![Chunk::part_finish()]).into_inner();
        assert_eq!(inner.next().await.unwrap().unwrap(), Chunk::part_finish());
        assert!(inner.next().await.is_none());
    }
}
