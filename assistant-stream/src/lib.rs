//! # assistant-stream
//!
//! Compose concurrently produced message parts into one ordered,
//! path-addressed chunk stream.
//!
//! A message under construction is a tree of parts: text, reasoning, tool
//! calls, sources and files. Each part is fed by its own producer, and the
//! producers run concurrently. This crate merges their output into a single
//! stream whose chunks carry a `path` naming the part they belong to, so a
//! consumer can rebuild the message by replaying the stream.
//!
//! ## Core Concepts
//!
//! - **[`AssistantStreamController`]**: high-level producer API that starts
//!   parts and wires their streams into the output
//! - **[`Multiplexer`]**: merges any number of chunk streams, registered at
//!   any time before it is sealed
//! - **[`PathEncodeExt`]**: rewrites chunk paths so every merged part gets a
//!   unique top-level position
//! - **[`IndexGenerator`]**: hands out those positions
//!
//! ## Example
//!
//! ```rust,no_run
//! use assistant_stream::{create_assistant_stream, StreamError};
//! use futures::StreamExt;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), StreamError> {
//! let (mut stream, _handle) = create_assistant_stream(|ctrl| async move {
//!     ctrl.append_text("Looking that up.")?;
//!     let call = ctrl.add_tool_call_part("search")?;
//!     call.args_text().append(r#"{"q":"rust"}"#)?;
//!     call.set_result(json!(["https://www.rust-lang.org"]), false)?;
//!     Ok::<_, StreamError>(())
//! });
//!
//! while let Some(chunk) = stream.next().await {
//!     let chunk = chunk?;
//!     println!("{} {:?}", chunk.chunk_type(), chunk.path);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod counter;
pub mod create;
pub mod error;
pub mod merge;
pub mod path;
pub mod stream;
pub mod text;
pub mod tool_call;

// Re-exports
pub use assistant_stream_core::{
    Chunk, ChunkPayload, FilePart, FinishReason, IdGenerator, PartInit, PartKind, Path,
    SourcePart, ToolResponse,
};
pub use config::StreamConfig;
pub use controller::{AssistantStreamController, ToolCallOptions};
pub use counter::IndexGenerator;
pub use create::{
    create_assistant_stream, create_assistant_stream_sync,
    create_assistant_stream_sync_with_config, create_assistant_stream_with_config,
};
pub use error::{CreateStreamError, StreamError, StreamResult};
pub use merge::{create_merge_stream, MergeStatus, MergeStream, Multiplexer};
pub use path::{PathAppendEncoder, PathEncodeExt, PathMergeEncoder};
pub use stream::AssistantStream;
pub use text::{create_text_stream, TextKind, TextStreamController};
pub use tool_call::{create_tool_call_stream, ToolCallStreamController};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        create_assistant_stream, create_assistant_stream_sync, AssistantStream,
        AssistantStreamController, Chunk, ChunkPayload, PartInit, StreamConfig, StreamError,
        StreamResult, ToolCallOptions, ToolResponse,
    };
}
