//! Text-like part controller.
//!
//! A [`TextStreamController`] feeds the chunk stream of one text, reasoning,
//! or tool-argument part. Controllers returned by [`create_text_stream`]
//! emit at the root path into their own channel; the orchestrator prefixes
//! the chunks with the part's position when it registers the stream.
//!
//! The orchestrator's implicit append part instead writes straight into the
//! multiplexer queue at its position, so its chunks stay ordered with the
//! part-start chunks around it.

use crate::merge::Multiplexer;
use assistant_stream_core::{Chunk, StreamError, StreamResult};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::sync::atomic::{AtomicBool, Ordering};

/// Receiving end of a part controller.
pub type ChunkReceiver = UnboundedReceiver<StreamResult<Chunk>>;

/// Which delta kind a [`TextStreamController`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// `text-delta`, finished by `part-finish`.
    Text,
    /// `reasoning-delta`, finished by `part-finish`.
    Reasoning,
    /// `args-text-delta`, finished by `args-text-finish`.
    ArgsText,
}

impl TextKind {
    /// Human readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
            Self::ArgsText => "tool-call args",
        }
    }

    fn delta(self, text: String) -> Chunk {
        match self {
            Self::Text => Chunk::text_delta(text),
            Self::Reasoning => Chunk::reasoning_delta(text),
            Self::ArgsText => Chunk::args_text_delta(text),
        }
    }

    fn finish(self) -> Chunk {
        match self {
            Self::Text | Self::Reasoning => Chunk::part_finish(),
            Self::ArgsText => Chunk::args_text_finish(),
        }
    }
}

/// Create a controller and the stream it feeds.
#[must_use]
pub fn create_text_stream(kind: TextKind) -> (TextStreamController, ChunkReceiver) {
    let (tx, rx) = mpsc::unbounded();
    (TextStreamController::with_sender(kind, tx, true), rx)
}

#[derive(Debug)]
enum ChunkSink {
    Channel {
        tx: UnboundedSender<StreamResult<Chunk>>,
        owned: bool,
    },
    Queue {
        merger: Multiplexer,
        index: usize,
    },
}

impl ChunkSink {
    fn send(&self, chunk: Chunk) -> StreamResult<()> {
        match self {
            Self::Channel { tx, .. } => tx
                .unbounded_send(Ok(chunk))
                .map_err(|_| StreamError::Cancelled),
            Self::Queue { merger, index } => merger.enqueue(chunk.with_prefix(*index)),
        }
    }

    fn release(&self) {
        if let Self::Channel { tx, owned: true } = self {
            tx.close_channel();
        }
    }
}

/// Appends deltas to one text-like part.
///
/// Dropping a channel-backed controller without closing it ends the stream
/// without a finish chunk.
#[derive(Debug)]
pub struct TextStreamController {
    kind: TextKind,
    sink: ChunkSink,
    closed: AtomicBool,
}

impl TextStreamController {
    pub(crate) fn with_sender(
        kind: TextKind,
        tx: UnboundedSender<StreamResult<Chunk>>,
        owns_channel: bool,
    ) -> Self {
        Self::with_sink(
            kind,
            ChunkSink::Channel {
                tx,
                owned: owns_channel,
            },
        )
    }

    /// A controller that enqueues into `merger` at position `index`.
    pub(crate) fn queued(kind: TextKind, merger: Multiplexer, index: usize) -> Self {
        Self::with_sink(kind, ChunkSink::Queue { merger, index })
    }

    fn with_sink(kind: TextKind, sink: ChunkSink) -> Self {
        Self {
            kind,
            sink,
            closed: AtomicBool::new(false),
        }
    }

    /// The delta kind.
    #[must_use]
    pub fn kind(&self) -> TextKind {
        self.kind
    }

    /// Append a delta.
    ///
    /// # Errors
    ///
    /// [`StreamError::PartClosed`] after [`close`](Self::close), or
    /// [`StreamError::Cancelled`] when the consumer went away. A queued
    /// controller also fails once its multiplexer stopped accepting chunks.
    pub fn append(&self, delta: impl Into<String>) -> StreamResult<()> {
        if self.is_closed() {
            return Err(StreamError::PartClosed(self.kind.label()));
        }
        self.sink.send(self.kind.delta(delta.into()))
    }

    /// Emit the finish chunk. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`StreamError::Cancelled`] when the consumer went away.
    pub fn close(&self) -> StreamResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let sent = self.sink.send(self.kind.finish());
        self.sink.release();
        sent
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn drain(rx: ChunkReceiver) -> Vec<Chunk> {
        rx.map(|r| r.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_text_append_and_close() {
        let (controller, rx) = create_text_stream(TextKind::Text);
        controller.append("Hello").unwrap();
        controller.append(", world").unwrap();
        controller.close().unwrap();

        assert_eq!(
            drain(rx).await,
            vec![
                Chunk::text_delta("Hello"),
                Chunk::text_delta(", world"),
                Chunk::part_finish(),
            ]
        );
    }

    #[rstest]
    #[case(TextKind::Text, "text-delta", "part-finish")]
    #[case(TextKind::Reasoning, "reasoning-delta", "part-finish")]
    #[case(TextKind::ArgsText, "args-text-delta", "args-text-finish")]
    #[tokio::test]
    async fn test_kind_chunks(#[case] kind: TextKind, #[case] delta: &str, #[case] finish: &str) {
        let (controller, rx) = create_text_stream(kind);
        controller.append("x").unwrap();
        controller.close().unwrap();

        let types: Vec<&str> = drain(rx).await.iter().map(Chunk::chunk_type).collect();
        assert_eq!(types, vec![delta, finish]);
    }

    #[tokio::test]
    async fn test_append_after_close_fails() {
        let (controller, rx) = create_text_stream(TextKind::Text);
        controller.close().unwrap();
        controller.close().unwrap();
        assert!(matches!(
            controller.append("late"),
            Err(StreamError::PartClosed("text"))
        ));
        assert_eq!(drain(rx).await, vec![Chunk::part_finish()]);
    }

    #[test]
    fn test_append_after_consumer_dropped() {
        let (controller, rx) = create_text_stream(TextKind::Reasoning);
        drop(rx);
        assert!(matches!(controller.append("x"), Err(StreamError::Cancelled)));
    }

    #[tokio::test]
    async fn test_queued_controller_writes_at_position() {
        let (merger, out) = crate::merge::create_merge_stream();
        let controller = TextStreamController::queued(TextKind::Reasoning, merger.clone(), 3);
        controller.append("hmm").unwrap();
        controller.close().unwrap();
        merger.seal();

        let chunks: Vec<Chunk> = out.map(|r| r.unwrap()).collect().await;
        assert_eq!(
            chunks,
            vec![
                Chunk::reasoning_delta("hmm").at(vec![3]),
                Chunk::part_finish().at(vec![3]),
            ]
        );
        assert!(matches!(controller.append("x"), Err(StreamError::PartClosed(_))));
    }

    #[tokio::test]
    async fn test_drop_ends_stream_without_finish() {
        let (controller, rx) = create_text_stream(TextKind::Text);
        controller.append("partial").unwrap();
        drop(controller);
        assert_eq!(drain(rx).await, vec![Chunk::text_delta("partial")]);
    }
}
