//! Part orchestrator.
//!
//! [`AssistantStreamController`] turns high-level producer calls into the
//! chunk stream of one message. It owns a [`Multiplexer`] and an
//! [`IndexGenerator`]; every part it starts gets the next position from the
//! generator, and its stream is registered with the multiplexer behind a
//! [`PathAppendEncoder`](crate::path::PathAppendEncoder).
//!
//! `append_text` and `append_reasoning` write into an implicit part that is
//! kept open until a part of another kind is appended, a part is added
//! explicitly, or the controller closes. The implicit part is not a separate
//! source: its chunks go straight into the multiplexer queue, so it is always
//! finished on the output before the next part starts.
//!
//! The controller is a cheap handle; clones share the same state. All calls
//! are serialised by one mutex.

use crate::config::StreamConfig;
use crate::counter::IndexGenerator;
use crate::merge::{create_merge_stream, Multiplexer};
use crate::path::PathEncodeExt;
use crate::stream::AssistantStream;
use crate::text::{create_text_stream, TextKind, TextStreamController};
use crate::tool_call::{create_tool_call_stream, ToolCallStreamController};
use assistant_stream_core::{
    Chunk, FilePart, PartInit, SourcePart, StreamResult, ToolResponse,
};
use futures::stream;
use futures::Stream;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Options for [`AssistantStreamController::add_tool_call_part`].
///
/// A bare tool name converts into options with every other field unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallOptions {
    /// Call id; generated when absent.
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Arguments, streamed as JSON text and closed immediately.
    #[serde(default)]
    pub args: Option<Value>,
    /// Result, set immediately (finishes the part).
    #[serde(default)]
    pub result: Option<Value>,
    /// UI artifact sent along with `result`.
    #[serde(default)]
    pub artifact: Option<Value>,
    /// Whether `result` describes a failure.
    #[serde(default)]
    pub is_error: Option<bool>,
}

impl ToolCallOptions {
    /// Options for `tool_name`.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            ..Self::default()
        }
    }

    /// Set the call id.
    #[must_use]
    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl Into<Value>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Set the result.
    #[must_use]
    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Set the artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<Value>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Mark the result as an error.
    #[must_use]
    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = Some(is_error);
        self
    }
}

impl From<&str> for ToolCallOptions {
    fn from(tool_name: &str) -> Self {
        Self::new(tool_name)
    }
}

impl From<String> for ToolCallOptions {
    fn from(tool_name: String) -> Self {
        Self::new(tool_name)
    }
}

/// Kinds of part that can be the implicit append target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppendKind {
    Text,
    Reasoning,
}

impl AppendKind {
    fn text_kind(self) -> TextKind {
        match self {
            Self::Text => TextKind::Text,
            Self::Reasoning => TextKind::Reasoning,
        }
    }

    fn part_init(self) -> PartInit {
        match self {
            Self::Text => PartInit::text(),
            Self::Reasoning => PartInit::reasoning(),
        }
    }
}

/// The part currently receiving implicit appends.
struct ActiveAppend {
    kind: AppendKind,
    controller: TextStreamController,
    parent_id: Option<String>,
}

#[derive(Default)]
struct AppendTarget(Option<ActiveAppend>);

impl AppendTarget {
    fn matching(&self, kind: AppendKind, parent_id: Option<&str>) -> Option<&TextStreamController> {
        self.0
            .as_ref()
            .filter(|active| active.kind == kind && active.parent_id.as_deref() == parent_id)
            .map(|active| &active.controller)
    }

    fn set(&mut self, active: ActiveAppend) {
        self.0 = Some(active);
    }

    fn close(&mut self) {
        if let Some(active) = self.0.take() {
            if let Err(e) = active.controller.close() {
                debug!(error = %e, "AssistantStream: append target already gone");
            }
        }
    }
}

struct ControllerState {
    append: AppendTarget,
    closed: bool,
    close_subscriber: Option<Box<dyn FnOnce() + Send>>,
}

struct ControllerShared {
    merger: Multiplexer,
    counter: Arc<IndexGenerator>,
    config: StreamConfig,
    state: Mutex<ControllerState>,
}

/// Builds the chunk stream of one assistant message.
#[derive(Clone)]
pub struct AssistantStreamController {
    shared: Arc<ControllerShared>,
    parent_id: Option<String>,
}

impl std::fmt::Debug for AssistantStreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantStreamController")
            .field("merger", &self.shared.merger)
            .field("next_index", &self.shared.counter.value())
            .field("parent_id", &self.parent_id)
            .finish()
    }
}

impl AssistantStreamController {
    /// Create a controller and the stream it feeds.
    #[must_use]
    pub fn new(config: StreamConfig) -> (Self, AssistantStream) {
        let (merger, output) = create_merge_stream();
        let controller = Self {
            shared: Arc::new(ControllerShared {
                merger,
                counter: Arc::new(IndexGenerator::new()),
                config,
                state: Mutex::new(ControllerState {
                    append: AppendTarget::default(),
                    closed: false,
                    close_subscriber: None,
                }),
            }),
            parent_id: None,
        };
        (controller, AssistantStream::from_stream(output))
    }

    /// A view of this controller that stamps `parent_id` on every part it
    /// starts. The view shares all state with `self`.
    #[must_use]
    pub fn with_parent_id(&self, parent_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            parent_id: Some(parent_id.into()),
        }
    }

    /// The parent id stamped by this view.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Append to the implicit text part, starting one if needed.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn append_text(&self, delta: impl Into<String>) -> StreamResult<()> {
        self.append(AppendKind::Text, delta.into())
    }

    /// Append to the implicit reasoning part, starting one if needed.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn append_reasoning(&self, delta: impl Into<String>) -> StreamResult<()> {
        self.append(AppendKind::Reasoning, delta.into())
    }

    /// Start a text part and hand its controller to the caller.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn add_text_part(&self) -> StreamResult<TextStreamController> {
        let mut state = self.shared.state.lock();
        self.start_text_part(&mut state, AppendKind::Text)
    }

    /// Start a reasoning part and hand its controller to the caller.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn add_reasoning_part(&self) -> StreamResult<TextStreamController> {
        let mut state = self.shared.state.lock();
        self.start_text_part(&mut state, AppendKind::Reasoning)
    }

    /// Start a tool-call part.
    ///
    /// Accepts a tool name or full [`ToolCallOptions`]. Supplied `args` are
    /// serialised, appended and closed; a supplied `result` is set right away.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away, or when
    /// `args` cannot be serialised.
    pub fn add_tool_call_part(
        &self,
        options: impl Into<ToolCallOptions>,
    ) -> StreamResult<ToolCallStreamController> {
        let options = options.into();
        let tool_call_id = options
            .tool_call_id
            .unwrap_or_else(|| self.shared.config.id_generator.generate());
        let (controller, rx) = create_tool_call_stream(tool_call_id, options.tool_name);

        {
            let mut state = self.shared.state.lock();
            let init = PartInit::tool_call(controller.tool_call_id(), controller.tool_name());
            self.add_part(&mut state, init, rx)?;
        }

        if let Some(args) = options.args {
            controller.args_text().append(serde_json::to_string(&args)?)?;
            controller.args_text().close()?;
        }
        if let Some(result) = options.result {
            controller.set_response(ToolResponse {
                result,
                artifact: options.artifact,
                is_error: options.is_error.unwrap_or(false),
            })?;
        }
        Ok(controller)
    }

    /// Add a finished source part.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn append_source(&self, source: SourcePart) -> StreamResult<()> {
        self.append_single(PartInit::source(source))
    }

    /// Add a finished file part.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn append_file(&self, file: FilePart) -> StreamResult<()> {
        self.append_single(PartInit::file(file))
    }

    /// Forward a chunk to the output unchanged.
    ///
    /// A root `part-start` reserves the next position.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn enqueue(&self, chunk: Chunk) -> StreamResult<()> {
        let _state = self.shared.state.lock();
        let counter = &self.shared.counter;
        self.shared.merger.enqueue_with(chunk, |c| {
            if c.is_root_part_start() {
                counter.up();
            }
        })
    }

    /// Splice in a foreign chunk stream.
    ///
    /// Its top-level parts get positions from the shared generator. The
    /// implicit append part stays open.
    ///
    /// # Errors
    ///
    /// Fails once the stream is closed or its consumer went away.
    pub fn merge<S>(&self, stream: S) -> StreamResult<()>
    where
        S: Stream<Item = StreamResult<Chunk>> + Send + 'static,
    {
        let _state = self.shared.state.lock();
        debug!(next_index = self.shared.counter.value(), "AssistantStream: merging stream");
        self.shared
            .merger
            .add_stream(stream.merge_paths(Arc::clone(&self.shared.counter)))
    }

    /// Close the implicit part, seal the output, and notify the close
    /// subscriber. Closing again is a no-op.
    pub fn close(&self) {
        let subscriber = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.append.close();
            self.shared.merger.seal();
            state.close_subscriber.take()
        };
        debug!(parts = self.shared.counter.value(), "AssistantStream: closed");
        if let Some(callback) = subscriber {
            callback();
        }
    }

    /// Whether the stream was closed or can no longer accept chunks.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed || self.shared.merger.seal_requested()
    }

    /// Register a one-shot callback run by [`close`](Self::close).
    ///
    /// Replaces any earlier subscriber. Runs immediately if the controller
    /// is already closed.
    pub fn subscribe_to_close<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.closed {
            drop(state);
            callback();
            return;
        }
        state.close_subscriber = Some(Box::new(callback));
    }

    fn append(&self, kind: AppendKind, delta: String) -> StreamResult<()> {
        let mut state = self.shared.state.lock();
        if let Some(controller) = state.append.matching(kind, self.parent_id.as_deref()) {
            return controller.append(delta);
        }

        let index = self.begin_part(&mut state, kind.part_init())?;
        let controller =
            TextStreamController::queued(kind.text_kind(), self.shared.merger.clone(), index);
        controller.append(delta)?;
        state.append.set(ActiveAppend {
            kind,
            controller,
            parent_id: self.parent_id.clone(),
        });
        Ok(())
    }

    fn append_single(&self, init: PartInit) -> StreamResult<()> {
        let mut state = self.shared.state.lock();
        let finished = stream::iter(vec![Ok(Chunk::part_finish())]);
        self.add_part(&mut state, init, finished).map(|_| ())
    }

    fn start_text_part(
        &self,
        state: &mut ControllerState,
        kind: AppendKind,
    ) -> StreamResult<TextStreamController> {
        let (controller, rx) = create_text_stream(kind.text_kind());
        self.add_part(state, kind.part_init(), rx)?;
        Ok(controller)
    }

    fn add_part<S>(&self, state: &mut ControllerState, init: PartInit, part: S) -> StreamResult<usize>
    where
        S: Stream<Item = StreamResult<Chunk>> + Send + 'static,
    {
        let index = self.begin_part(state, init)?;
        self.shared.merger.add_stream(part.append_path(index))?;
        Ok(index)
    }

    /// Close the append target, then emit the part-start and reserve its
    /// position under one multiplexer lock.
    fn begin_part(&self, state: &mut ControllerState, init: PartInit) -> StreamResult<usize> {
        state.append.close();

        let init = match &self.parent_id {
            Some(parent_id) => init.with_parent_id(parent_id.clone()),
            None => init,
        };
        let part_type = init.part_type();
        let counter = &self.shared.counter;
        let index = self
            .shared
            .merger
            .enqueue_with(Chunk::part_start(init), |_| counter.up())?;
        debug!(index, part_type, "AssistantStream: part started");
        Ok(index)
    }
}
