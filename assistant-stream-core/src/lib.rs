//! # assistant-stream-core
//!
//! Core types for the assistant-stream crates.
//!
//! This crate provides the data model that flows through an assistant stream:
//!
//! - **Chunks**: `type`-tagged, path-addressed units of the stream
//! - **Parts**: descriptors announcing text, reasoning, tool-call, source and
//!   file parts
//! - **Errors**: the [`StreamError`] type shared by producers and consumers
//! - **Identifiers**: tool-call id generation
//!
//! ## Example
//!
//! ```rust
//! use assistant_stream_core::{Chunk, PartInit};
//!
//! let start = Chunk::part_start(PartInit::text());
//! let delta = Chunk::text_delta("Hello").at(vec![0]);
//!
//! assert!(start.is_root_part_start());
//! assert_eq!(delta.chunk_type(), "text-delta");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod chunk;
pub mod errors;
pub mod identifier;
pub mod part;

// Re-exports for convenience
pub use chunk::{Chunk, ChunkPayload, Path};
pub use errors::{StreamError, StreamResult};
pub use identifier::{generate_tool_call_id, IdGenerator};
pub use part::{FilePart, FinishReason, PartInit, PartKind, SourcePart, ToolResponse};

/// Prelude module for common imports.
///
/// ```rust
/// use assistant_stream_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::chunk::{Chunk, ChunkPayload, Path};
    pub use crate::errors::{StreamError, StreamResult};
    pub use crate::identifier::{generate_tool_call_id, IdGenerator};
    pub use crate::part::{FilePart, FinishReason, PartInit, PartKind, SourcePart, ToolResponse};
}
