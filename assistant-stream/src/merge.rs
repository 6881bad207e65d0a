//! Stream multiplexer.
//!
//! [`create_merge_stream`] returns a [`Multiplexer`] handle and the
//! [`MergeStream`] it feeds. Sources can be registered through the handle at
//! any time before it is sealed, including after the consumer started pulling.
//!
//! Sources are polled only when the consumer asks for the next chunk, so a
//! slow consumer holds every producer back. Each source's chunks come out in
//! that source's own order; across sources whichever is ready first wins.
//! Directly enqueued chunks are delivered before the next source chunk.
//! Any `Err` item from a source, whatever its variant, fails the output: the
//! error is yielded as the last item and every other source is dropped.
//!
//! All mutation and all polling of sources happen behind one mutex. Position
//! draws made while a chunk is enqueued (see [`Multiplexer::enqueue_with`])
//! and draws made by merge encoders while the consumer polls are therefore
//! totally ordered, and root `part-start` chunks reach the consumer in the
//! order their positions were drawn.

use assistant_stream_core::{Chunk, StreamError, StreamResult};
use futures::stream::{BoxStream, FusedStream, SelectAll};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace, warn};

type Source = BoxStream<'static, StreamResult<Chunk>>;

/// Lifecycle of the merged output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    /// Accepting sources and chunks (or draining after `seal`).
    Open,
    /// Output finished normally.
    Closed,
    /// A source failed; the output ended with its error.
    Failed(String),
    /// The consumer dropped the output.
    Cancelled,
}

struct MergeState {
    queue: VecDeque<Chunk>,
    sources: SelectAll<Source>,
    sealed: bool,
    status: MergeStatus,
    waker: Option<Waker>,
    registered: usize,
}

impl MergeState {
    fn check_open(&self) -> StreamResult<()> {
        match &self.status {
            MergeStatus::Failed(msg) => Err(StreamError::Failed(msg.clone())),
            MergeStatus::Cancelled => Err(StreamError::Cancelled),
            MergeStatus::Closed => Err(StreamError::Sealed),
            MergeStatus::Open if self.sealed => Err(StreamError::Sealed),
            MergeStatus::Open => Ok(()),
        }
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Create a multiplexer and its output stream.
#[must_use]
pub fn create_merge_stream() -> (Multiplexer, MergeStream) {
    let shared = Arc::new(Mutex::new(MergeState {
        queue: VecDeque::new(),
        sources: SelectAll::new(),
        sealed: false,
        status: MergeStatus::Open,
        waker: None,
        registered: 0,
    }));
    (
        Multiplexer {
            shared: Arc::clone(&shared),
        },
        MergeStream {
            shared,
            done: false,
        },
    )
}

/// Producer-side handle of a merge stream.
#[derive(Clone)]
pub struct Multiplexer {
    shared: Arc<Mutex<MergeState>>,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Multiplexer")
            .field("sealed", &state.sealed)
            .field("status", &state.status)
            .field("pending", &state.sources.len())
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl Multiplexer {
    /// Register a source.
    ///
    /// # Errors
    ///
    /// Fails once the multiplexer is sealed, failed, or its consumer is gone.
    pub fn add_stream<S>(&self, source: S) -> StreamResult<()>
    where
        S: Stream<Item = StreamResult<Chunk>> + Send + 'static,
    {
        let mut state = self.shared.lock();
        state.check_open()?;
        state.sources.push(source.boxed());
        state.registered += 1;
        debug!(
            pending = state.sources.len(),
            registered = state.registered,
            "Multiplexer: source registered"
        );
        state.wake();
        Ok(())
    }

    /// Forward a chunk directly to the output.
    ///
    /// # Errors
    ///
    /// Fails once the multiplexer is sealed, failed, or its consumer is gone.
    pub fn enqueue(&self, chunk: Chunk) -> StreamResult<()> {
        self.enqueue_with(chunk, |_| ())
    }

    /// Forward a chunk directly to the output and run `f` under the same lock.
    ///
    /// `f` sees the chunk before it is queued; its result is returned.
    ///
    /// # Errors
    ///
    /// Fails once the multiplexer is sealed, failed, or its consumer is gone.
    /// `f` is not called in that case.
    pub fn enqueue_with<R>(&self, chunk: Chunk, f: impl FnOnce(&Chunk) -> R) -> StreamResult<R> {
        let mut state = self.shared.lock();
        state.check_open()?;
        let out = f(&chunk);
        trace!(chunk_type = chunk.chunk_type(), path = ?chunk.path, "Multiplexer: enqueue");
        state.queue.push_back(chunk);
        state.wake();
        Ok(out)
    }

    /// Stop accepting sources; the output ends once every source finished.
    ///
    /// Calling it again is a no-op.
    pub fn seal(&self) {
        let mut state = self.shared.lock();
        if state.sealed {
            return;
        }
        state.sealed = true;
        debug!(pending = state.sources.len(), "Multiplexer: sealed");
        state.wake();
    }

    /// Whether [`seal`](Self::seal) was called or the output already ended.
    #[must_use]
    pub fn seal_requested(&self) -> bool {
        let state = self.shared.lock();
        state.sealed || state.status != MergeStatus::Open
    }

    /// Whether the output has fully closed.
    ///
    /// True after a failure, after the consumer went away, or once the
    /// multiplexer is sealed with nothing left to deliver.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        let state = self.shared.lock();
        match state.status {
            MergeStatus::Open => {
                state.sealed && state.sources.is_empty() && state.queue.is_empty()
            }
            _ => true,
        }
    }

    /// Number of registered sources that have not finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().sources.len()
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> MergeStatus {
        self.shared.lock().status.clone()
    }
}

/// Consumer side of a merge stream.
///
/// Dropping it drops every registered source.
pub struct MergeStream {
    shared: Arc<Mutex<MergeState>>,
    done: bool,
}

impl std::fmt::Debug for MergeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeStream").field("done", &self.done).finish()
    }
}

impl Stream for MergeStream {
    type Item = StreamResult<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut state = this.shared.lock();
        if let Some(chunk) = state.queue.pop_front() {
            return Poll::Ready(Some(Ok(chunk)));
        }

        match state.sources.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(e))) => {
                warn!(error = %e, "Multiplexer: source failed, closing output");
                state.status = MergeStatus::Failed(e.to_string());
                state.queue.clear();
                let sources = std::mem::take(&mut state.sources);
                drop(state);
                drop(sources);
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) | Poll::Pending => {
                if state.sealed && state.sources.is_empty() {
                    debug!(registered = state.registered, "Multiplexer: output closed");
                    state.status = MergeStatus::Closed;
                    this.done = true;
                    Poll::Ready(None)
                } else {
                    state.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }
    }
}

impl FusedStream for MergeStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl Drop for MergeStream {
    fn drop(&mut self) {
        let sources = {
            let mut state = self.shared.lock();
            if state.status != MergeStatus::Open {
                return;
            }
            debug!(pending = state.sources.len(), "Multiplexer: consumer dropped, cancelling sources");
            state.status = MergeStatus::Cancelled;
            state.queue.clear();
            state.waker = None;
            std::mem::take(&mut state.sources)
        };
        drop(sources);
    }
}
