//! Chunk types.
//!
//! A [`Chunk`] is one unit of an assistant stream: a `type`-tagged payload
//! addressed by a `path` into the tree of parts being built.
//!
//! A `part-start` chunk is emitted at the path of the *parent* (the root is
//! the empty path). The new part takes the next free position under that
//! parent, and every later chunk of the part carries the part's full address
//! as its path prefix.

use crate::part::{FinishReason, PartInit, ToolResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Address of a chunk in the part tree; empty is the root.
pub type Path = Vec<usize>;

/// One unit of an assistant stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Kind-specific payload, tagged by `type`.
    #[serde(flatten)]
    pub payload: ChunkPayload,
    /// Location in the part tree.
    pub path: Path,
}

/// Kind-specific chunk payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChunkPayload {
    /// A new part begins under `path`.
    PartStart {
        /// Descriptor of the new part.
        part: PartInit,
    },
    /// Text appended to a text part.
    TextDelta {
        /// The appended text.
        #[serde(rename = "textDelta")]
        text_delta: String,
    },
    /// Text appended to a reasoning part.
    ReasoningDelta {
        /// The appended text.
        #[serde(rename = "textDelta")]
        text_delta: String,
    },
    /// Argument text appended to a tool call.
    ArgsTextDelta {
        /// The appended argument text.
        #[serde(rename = "textDelta")]
        text_delta: String,
    },
    /// Tool-call argument text is complete.
    ArgsTextFinish,
    /// Tool-call result.
    #[serde(rename = "result")]
    ToolResult(ToolResponse),
    /// The part at `path` is complete.
    PartFinish,
    /// Failure report.
    Error {
        /// Human readable message.
        error: String,
    },
    /// Opaque application data.
    Data {
        /// The data value.
        data: Value,
    },
    /// Message annotations.
    Annotations {
        /// Annotation values.
        annotations: Vec<Value>,
    },
    /// A model step begins.
    StepStart {
        /// Message the step belongs to.
        #[serde(rename = "messageId")]
        message_id: String,
    },
    /// A model step ends.
    StepFinish {
        /// Why the step finished.
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
        /// Whether another step follows.
        #[serde(rename = "isContinued", default)]
        is_continued: bool,
    },
    /// The whole message is complete.
    MessageFinish {
        /// Why the message finished.
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
    },
    /// Application state operations.
    UpdateState {
        /// Opaque operation list.
        operations: Vec<Value>,
    },
}

impl ChunkPayload {
    /// Get the chunk type identifier.
    #[must_use]
    pub fn chunk_type(&self) -> &'static str {
        match self {
            Self::PartStart { .. } => "part-start",
            Self::TextDelta { .. } => "text-delta",
            Self::ReasoningDelta { .. } => "reasoning-delta",
            Self::ArgsTextDelta { .. } => "args-text-delta",
            Self::ArgsTextFinish => "args-text-finish",
            Self::ToolResult(_) => "result",
            Self::PartFinish => "part-finish",
            Self::Error { .. } => "error",
            Self::Data { .. } => "data",
            Self::Annotations { .. } => "annotations",
            Self::StepStart { .. } => "step-start",
            Self::StepFinish { .. } => "step-finish",
            Self::MessageFinish { .. } => "message-finish",
            Self::UpdateState { .. } => "update-state",
        }
    }
}

impl Chunk {
    /// Create a chunk at `path`.
    #[must_use]
    pub fn new(path: Path, payload: ChunkPayload) -> Self {
        Self { payload, path }
    }

    /// Create a chunk at the root path.
    #[must_use]
    pub fn root(payload: ChunkPayload) -> Self {
        Self::new(Vec::new(), payload)
    }

    /// `part-start` at the root.
    #[must_use]
    pub fn part_start(part: PartInit) -> Self {
        Self::root(ChunkPayload::PartStart { part })
    }

    /// `text-delta` at the root.
    #[must_use]
    pub fn text_delta(text_delta: impl Into<String>) -> Self {
        Self::root(ChunkPayload::TextDelta {
            text_delta: text_delta.into(),
        })
    }

    /// `reasoning-delta` at the root.
    #[must_use]
    pub fn reasoning_delta(text_delta: impl Into<String>) -> Self {
        Self::root(ChunkPayload::ReasoningDelta {
            text_delta: text_delta.into(),
        })
    }

    /// `args-text-delta` at the root.
    #[must_use]
    pub fn args_text_delta(text_delta: impl Into<String>) -> Self {
        Self::root(ChunkPayload::ArgsTextDelta {
            text_delta: text_delta.into(),
        })
    }

    /// `args-text-finish` at the root.
    #[must_use]
    pub fn args_text_finish() -> Self {
        Self::root(ChunkPayload::ArgsTextFinish)
    }

    /// `result` at the root.
    #[must_use]
    pub fn tool_result(response: ToolResponse) -> Self {
        Self::root(ChunkPayload::ToolResult(response))
    }

    /// `part-finish` at the root.
    #[must_use]
    pub fn part_finish() -> Self {
        Self::root(ChunkPayload::PartFinish)
    }

    /// `error` at the root.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::root(ChunkPayload::Error {
            error: error.into(),
        })
    }

    /// `data` at the root.
    #[must_use]
    pub fn data(data: impl Into<Value>) -> Self {
        Self::root(ChunkPayload::Data { data: data.into() })
    }

    /// Move the chunk to `path`.
    #[must_use]
    pub fn at(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    /// Prepend `index` to the path.
    #[must_use]
    pub fn with_prefix(mut self, index: usize) -> Self {
        self.path.insert(0, index);
        self
    }

    /// Get the chunk type identifier.
    #[must_use]
    pub fn chunk_type(&self) -> &'static str {
        self.payload.chunk_type()
    }

    /// Check if the chunk sits at the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Check if the chunk starts a new top-level part.
    #[must_use]
    pub fn is_root_part_start(&self) -> bool {
        self.is_root() && matches!(self.payload, ChunkPayload::PartStart { .. })
    }

    /// Get the appended text for any of the delta kinds.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            ChunkPayload::TextDelta { text_delta }
            | ChunkPayload::ReasoningDelta { text_delta }
            | ChunkPayload::ArgsTextDelta { text_delta } => Some(text_delta),
            _ => None,
        }
    }
}
