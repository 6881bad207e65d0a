//! Path rewriting encoders.
//!
//! Every source registered with the multiplexer produces chunks addressed
//! relative to itself. The encoders here move those addresses into the shared
//! position space of the output:
//!
//! - [`PathAppendEncoder`] prefixes every path with one fixed position. It is
//!   used for the stream of a single part the orchestrator started itself.
//! - [`PathMergeEncoder`] renumbers the top-level parts of a foreign stream,
//!   drawing one fresh position per root `part-start` from the shared
//!   [`IndexGenerator`].

use crate::counter::IndexGenerator;
use assistant_stream_core::{Chunk, StreamError, StreamResult};
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Prefixes every chunk path with a fixed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAppendEncoder {
    index: usize,
}

impl PathAppendEncoder {
    /// Create an encoder for position `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// The fixed position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Map path `P` to `[index] ++ P`.
    #[must_use]
    pub fn encode(&self, chunk: Chunk) -> Chunk {
        chunk.with_prefix(self.index)
    }
}

/// Renumbers the top-level parts of a merged stream.
///
/// Root `part-start` chunks pass through unchanged and record a mapping from
/// the stream's own part index to a freshly drawn shared position. Chunks
/// below the root get their first path segment replaced by that position.
#[derive(Debug)]
pub struct PathMergeEncoder {
    counter: Arc<IndexGenerator>,
    next_inner: usize,
    mapping: HashMap<usize, usize>,
}

impl PathMergeEncoder {
    /// Create an encoder drawing positions from `counter`.
    #[must_use]
    pub fn new(counter: Arc<IndexGenerator>) -> Self {
        Self {
            counter,
            next_inner: 0,
            mapping: HashMap::new(),
        }
    }

    /// Positions assigned so far, in inner-index order.
    #[must_use]
    pub fn assigned(&self) -> Vec<usize> {
        (0..self.next_inner)
            .filter_map(|inner| self.mapping.get(&inner).copied())
            .collect()
    }

    /// Rewrite one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::PathNotFound`] when the chunk addresses a part
    /// the stream never started.
    pub fn encode(&mut self, mut chunk: Chunk) -> StreamResult<Chunk> {
        if chunk.is_root_part_start() {
            let outer = self.counter.up();
            self.mapping.insert(self.next_inner, outer);
            self.next_inner += 1;
            return Ok(chunk);
        }

        let Some(first) = chunk.path.first_mut() else {
            return Ok(chunk);
        };
        let mapped = self
            .mapping
            .get(first)
            .copied()
            .ok_or(StreamError::PathNotFound { index: *first })?;
        *first = mapped;
        Ok(chunk)
    }
}

pin_project! {
    /// Stream applying a [`PathAppendEncoder`] to every chunk.
    pub struct PathAppendStream<S> {
        #[pin]
        inner: S,
        encoder: PathAppendEncoder,
    }
}

impl<S> PathAppendStream<S> {
    /// Wrap `inner`.
    pub fn new(inner: S, index: usize) -> Self {
        Self {
            inner,
            encoder: PathAppendEncoder::new(index),
        }
    }
}

impl<S> Stream for PathAppendStream<S>
where
    S: Stream<Item = StreamResult<Chunk>>,
{
    type Item = StreamResult<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let encoder = *this.encoder;
        this.inner
            .poll_next(cx)
            .map(|item| item.map(|res| res.map(|chunk| encoder.encode(chunk))))
    }
}

pin_project! {
    /// Stream applying a [`PathMergeEncoder`] to every chunk.
    ///
    /// Ends after the first error.
    pub struct PathMergeStream<S> {
        #[pin]
        inner: S,
        encoder: PathMergeEncoder,
        failed: bool,
    }
}

impl<S> PathMergeStream<S> {
    /// Wrap `inner`, drawing positions from `counter`.
    pub fn new(inner: S, counter: Arc<IndexGenerator>) -> Self {
        Self {
            inner,
            encoder: PathMergeEncoder::new(counter),
            failed: false,
        }
    }
}

impl<S> Stream for PathMergeStream<S>
where
    S: Stream<Item = StreamResult<Chunk>>,
{
    type Item = StreamResult<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.failed {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let encoded = this.encoder.encode(chunk);
                if encoded.is_err() {
                    *this.failed = true;
                }
                Poll::Ready(Some(encoded))
            }
            Poll::Ready(Some(Err(e))) => {
                *this.failed = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Extension trait for path rewriting.
pub trait PathEncodeExt: Stream<Item = StreamResult<Chunk>> + Sized {
    /// Prefix every path with `index`.
    fn append_path(self, index: usize) -> PathAppendStream<Self> {
        PathAppendStream::new(self, index)
    }

    /// Renumber top-level parts using positions from `counter`.
    fn merge_paths(self, counter: Arc<IndexGenerator>) -> PathMergeStream<Self> {
        PathMergeStream::new(self, counter)
    }
}

impl<S> PathEncodeExt for S where S: Stream<Item = StreamResult<Chunk>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_stream_core::PartInit;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, vec![], vec![0])]
    #[case(3, vec![], vec![3])]
    #[case(3, vec![1], vec![3, 1])]
    #[case(9, vec![0, 2, 5], vec![9, 0, 2, 5])]
    fn test_append_encoder(#[case] k: usize, #[case] path: Vec<usize>, #[case] expected: Vec<usize>) {
        let encoder = PathAppendEncoder::new(k);
        let out = encoder.encode(Chunk::text_delta("x").at(path));
        assert_eq!(out.path, expected);
        assert_eq!(out.text(), Some("x"));
    }

    #[test]
    fn test_append_encoder_is_injective() {
        let encoder = PathAppendEncoder::new(4);
        let a = encoder.encode(Chunk::part_finish().at(vec![1]));
        let b = encoder.encode(Chunk::part_finish().at(vec![1, 0]));
        let c = encoder.encode(Chunk::part_finish());
        assert_ne!(a.path, b.path);
        assert_ne!(a.path, c.path);
        assert_ne!(b.path, c.path);
    }

    #[test]
    fn test_merge_encoder_maps_parts() {
        let counter = Arc::new(IndexGenerator::new());
        // Position 0 and 1 are already taken by the owner.
        counter.up();
        counter.up();

        let mut encoder = PathMergeEncoder::new(Arc::clone(&counter));
        let start = encoder.encode(Chunk::part_start(PartInit::text())).unwrap();
        assert!(start.is_root_part_start());

        let delta = encoder.encode(Chunk::text_delta("a").at(vec![0])).unwrap();
        assert_eq!(delta.path, vec![2]);

        encoder.encode(Chunk::part_start(PartInit::reasoning())).unwrap();
        let nested = encoder.encode(Chunk::part_finish().at(vec![1, 4])).unwrap();
        assert_eq!(nested.path, vec![3, 4]);

        assert_eq!(encoder.assigned(), vec![2, 3]);
        assert_eq!(counter.value(), 4);
    }

    #[test]
    fn test_interleaved_merges_draw_in_observed_order() {
        let counter = Arc::new(IndexGenerator::new());
        let mut left = PathMergeEncoder::new(Arc::clone(&counter));
        let mut right = PathMergeEncoder::new(Arc::clone(&counter));

        left.encode(Chunk::part_start(PartInit::text())).unwrap();
        right.encode(Chunk::part_start(PartInit::text())).unwrap();
        right.encode(Chunk::part_start(PartInit::reasoning())).unwrap();
        left.encode(Chunk::part_start(PartInit::reasoning())).unwrap();

        assert_eq!(left.assigned(), vec![0, 3]);
        assert_eq!(right.assigned(), vec![1, 2]);
        assert_eq!(
            left.encode(Chunk::part_finish().at(vec![1])).unwrap().path,
            vec![3]
        );
    }

    #[test]
    fn test_merge_encoder_passes_root_chunks() {
        let mut encoder = PathMergeEncoder::new(Arc::new(IndexGenerator::new()));
        let err = encoder.encode(Chunk::error("boom")).unwrap();
        assert!(err.is_root());
        assert!(encoder.assigned().is_empty());
    }

    #[test]
    fn test_merge_encoder_unknown_path() {
        let mut encoder = PathMergeEncoder::new(Arc::new(IndexGenerator::new()));
        let err = encoder.encode(Chunk::text_delta("a").at(vec![0])).unwrap_err();
        assert!(matches!(err, StreamError::PathNotFound { index: 0 }));
    }

    #[tokio::test]
    async fn test_append_stream() {
        let source = stream::iter(vec![Ok(Chunk::text_delta("a")), Ok(Chunk::part_finish())]);
        let out: Vec<Chunk> = source
            .append_path(5)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(
            out,
            vec![
                Chunk::text_delta("a").at(vec![5]),
                Chunk::part_finish().at(vec![5]),
            ]
        );
    }

    #[tokio::test]
    async fn test_merge_stream_stops_after_error() {
        let source = stream::iter(vec![
            Ok(Chunk::text_delta("orphan").at(vec![7])),
            Ok(Chunk::part_start(PartInit::text())),
        ]);
        let out: Vec<StreamResult<Chunk>> = source
            .merge_paths(Arc::new(IndexGenerator::new()))
            .collect()
            .await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(StreamError::PathNotFound { index: 7 })));
    }
}
