//! Part descriptors.
//!
//! A [`PartInit`] announces a new part of the assembled message. It is
//! created once when the part starts and never changes afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptor carried by a `part-start` chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInit {
    /// Kind of the part and its kind-specific metadata.
    #[serde(flatten)]
    pub kind: PartKind,
    /// Logical parent the part is grouped under.
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl PartInit {
    /// Create a descriptor for the given kind.
    #[must_use]
    pub fn new(kind: PartKind) -> Self {
        Self {
            kind,
            parent_id: None,
        }
    }

    /// Plain text part.
    #[must_use]
    pub fn text() -> Self {
        Self::new(PartKind::Text)
    }

    /// Reasoning part.
    #[must_use]
    pub fn reasoning() -> Self {
        Self::new(PartKind::Reasoning)
    }

    /// Tool-call part.
    #[must_use]
    pub fn tool_call(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::new(PartKind::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
        })
    }

    /// Cited source part.
    #[must_use]
    pub fn source(source: SourcePart) -> Self {
        Self::new(PartKind::Source(source))
    }

    /// Attached file part.
    #[must_use]
    pub fn file(file: FilePart) -> Self {
        Self::new(PartKind::File(file))
    }

    /// Set the parent id.
    #[must_use]
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Get the part type identifier.
    #[must_use]
    pub fn part_type(&self) -> &'static str {
        self.kind.part_type()
    }
}

/// Kind of a part, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartKind {
    /// Free text.
    Text,
    /// Reasoning text.
    Reasoning,
    /// Tool invocation.
    ToolCall {
        /// Identifier correlating the call with its result.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Name of the invoked tool.
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    /// Cited source.
    Source(SourcePart),
    /// Attached file.
    File(FilePart),
}

impl PartKind {
    /// Get the part type identifier.
    #[must_use]
    pub fn part_type(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
            Self::ToolCall { .. } => "tool-call",
            Self::Source(_) => "source",
            Self::File(_) => "file",
        }
    }
}

/// A cited source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePart {
    /// Source type; only `url` sources exist today.
    pub source_type: String,
    /// Source identifier.
    pub id: String,
    /// Source URL.
    pub url: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SourcePart {
    /// Create a URL source.
    #[must_use]
    pub fn url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source_type: "url".to_string(),
            id: id.into(),
            url: url.into(),
            title: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// An attached file, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    /// Base64 file contents.
    pub data: String,
    /// MIME type of the contents.
    pub mime_type: String,
}

impl FilePart {
    /// Create a file descriptor.
    #[must_use]
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Value handed back to the model.
    pub result: Value,
    /// Extra data for the UI only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Value>,
    /// Whether the result describes a failure.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    /// Create a successful response.
    #[must_use]
    pub fn new(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            artifact: None,
            is_error: false,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(result: impl Into<Value>) -> Self {
        Self {
            is_error: true,
            ..Self::new(result)
        }
    }

    /// Set the artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<Value>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }
}

/// Why a step or message finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Normal stop.
    Stop,
    /// Maximum token length reached.
    Length,
    /// Content filter triggered.
    ContentFilter,
    /// Tool calls need to be executed.
    ToolCalls,
    /// Error occurred.
    Error,
    /// Other reason.
    Other,
    /// Unknown reason.
    #[default]
    Unknown,
}
