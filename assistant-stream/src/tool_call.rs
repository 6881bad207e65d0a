//! Tool-call part controller.

use crate::text::{ChunkReceiver, TextKind, TextStreamController};
use assistant_stream_core::{Chunk, StreamError, StreamResult, ToolResponse};
use futures::channel::mpsc::{self, UnboundedSender};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Create a tool-call controller and the stream it feeds.
#[must_use]
pub fn create_tool_call_stream(
    tool_call_id: impl Into<String>,
    tool_name: impl Into<String>,
) -> (ToolCallStreamController, ChunkReceiver) {
    let (tx, rx) = mpsc::unbounded();
    let controller = ToolCallStreamController {
        tool_call_id: tool_call_id.into(),
        tool_name: tool_name.into(),
        args_text: TextStreamController::with_sender(TextKind::ArgsText, tx.clone(), false),
        tx,
        closed: AtomicBool::new(false),
    };
    (controller, rx)
}

/// Drives one tool-call part: argument text, then an optional result.
///
/// Emits `args-text-delta` chunks, `args-text-finish`, an optional `result`
/// chunk, and `part-finish`.
#[derive(Debug)]
pub struct ToolCallStreamController {
    tool_call_id: String,
    tool_name: String,
    args_text: TextStreamController,
    tx: UnboundedSender<StreamResult<Chunk>>,
    closed: AtomicBool,
}

impl ToolCallStreamController {
    /// The tool call id.
    #[must_use]
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    /// The tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Controller for the streamed argument text.
    #[must_use]
    pub fn args_text(&self) -> &TextStreamController {
        &self.args_text
    }

    /// Set the result and finish the part.
    ///
    /// # Errors
    ///
    /// See [`set_response`](Self::set_response).
    pub fn set_result(&self, result: impl Into<Value>, is_error: bool) -> StreamResult<()> {
        let response = if is_error {
            ToolResponse::error(result)
        } else {
            ToolResponse::new(result)
        };
        self.set_response(response)
    }

    /// Set the full response and finish the part.
    ///
    /// The argument text is closed first if it is still open.
    ///
    /// # Errors
    ///
    /// [`StreamError::PartClosed`] if the part already finished, or
    /// [`StreamError::Cancelled`] when the consumer went away.
    pub fn set_response(&self, response: ToolResponse) -> StreamResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StreamError::PartClosed("tool-call"));
        }
        self.finish(Some(response))
    }

    /// Finish the part. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`StreamError::Cancelled`] when the consumer went away.
    pub fn close(&self) -> StreamResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.finish(None)
    }

    /// Whether the part finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Emit the tail of the part. Callers must have claimed `closed`.
    fn finish(&self, response: Option<ToolResponse>) -> StreamResult<()> {
        let sent = self.args_text.close().and_then(|()| {
            response
                .map(Chunk::tool_result)
                .into_iter()
                .chain(std::iter::once(Chunk::part_finish()))
                .try_for_each(|chunk| {
                    self.tx
                        .unbounded_send(Ok(chunk))
                        .map_err(|_| StreamError::Cancelled)
                })
        });
        self.tx.close_channel();
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{Arc, Barrier};

    async fn drain(rx: ChunkReceiver) -> Vec<Chunk> {
        rx.map(|r| r.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_args_then_result() {
        let (controller, rx) = create_tool_call_stream("call_1", "weather");
        assert_eq!(controller.tool_call_id(), "call_1");
        assert_eq!(controller.tool_name(), "weather");

        controller.args_text().append("{\"city\":").unwrap();
        controller.args_text().append("\"Paris\"}").unwrap();
        controller.args_text().close().unwrap();
        controller.set_result(json!({"temp": 21}), false).unwrap();

        assert_eq!(
            drain(rx).await,
            vec![
                Chunk::args_text_delta("{\"city\":"),
                Chunk::args_text_delta("\"Paris\"}"),
                Chunk::args_text_finish(),
                Chunk::tool_result(ToolResponse::new(json!({"temp": 21}))),
                Chunk::part_finish(),
            ]
        );
        assert!(controller.is_closed());
    }

    #[tokio::test]
    async fn test_result_closes_open_args() {
        let (controller, rx) = create_tool_call_stream("call_1", "t");
        controller.args_text().append("{}").unwrap();
        controller
            .set_response(ToolResponse::error("failed").with_artifact(json!([1])))
            .unwrap();

        let types: Vec<&str> = drain(rx).await.iter().map(Chunk::chunk_type).collect();
        assert_eq!(
            types,
            vec!["args-text-delta", "args-text-finish", "result", "part-finish"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_results_emit_once() {
        let (controller, rx) = create_tool_call_stream("call_1", "t");
        let controller = Arc::new(controller);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let controller = Arc::clone(&controller);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    controller.set_result(i, false)
                })
            })
            .collect();
        let outcomes: Vec<StreamResult<()>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StreamError::PartClosed("tool-call"))));

        let types: Vec<&str> = drain(rx).await.iter().map(Chunk::chunk_type).collect();
        assert_eq!(types, vec!["args-text-finish", "result", "part-finish"]);
    }

    #[tokio::test]
    async fn test_close_without_result() {
        let (controller, rx) = create_tool_call_stream("call_1", "t");
        controller.close().unwrap();
        controller.close().unwrap();
        assert!(matches!(
            controller.set_result(1, false),
            Err(StreamError::PartClosed("tool-call"))
        ));
        assert!(matches!(
            controller.args_text().append("x"),
            Err(StreamError::PartClosed(_))
        ));

        assert_eq!(
            drain(rx).await,
            vec![Chunk::args_text_finish(), Chunk::part_finish()]
        );
    }
}
