//! Stream entry points.
//!
//! Each entry point builds an [`AssistantStreamController`], hands it to a
//! producer, and returns the stream the producer feeds. When the producer
//! finishes the stream is closed unless the producer already closed it. When
//! the producer fails, one root `error` chunk is enqueued first.

use crate::config::StreamConfig;
use crate::controller::AssistantStreamController;
use crate::error::CreateStreamError;
use crate::stream::AssistantStream;
use assistant_stream_core::Chunk;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Run an async producer on the tokio runtime.
///
/// The returned handle resolves to the producer's result once it finished
/// and the stream was closed. A panicking producer closes the stream and the
/// panic surfaces through the handle.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn create_assistant_stream<F, Fut, E>(producer: F) -> (AssistantStream, JoinHandle<Result<(), E>>)
where
    F: FnOnce(AssistantStreamController) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    create_assistant_stream_with_config(StreamConfig::default(), producer)
}

/// [`create_assistant_stream`] with an explicit configuration.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn create_assistant_stream_with_config<F, Fut, E>(
    config: StreamConfig,
    producer: F,
) -> (AssistantStream, JoinHandle<Result<(), E>>)
where
    F: FnOnce(AssistantStreamController) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let (controller, stream) = AssistantStreamController::new(config);
    let running = producer(controller.clone());

    let handle = tokio::spawn(async move {
        match AssertUnwindSafe(running).catch_unwind().await {
            Ok(result) => finish(&controller, result),
            Err(panic) => {
                warn!("AssistantStream: producer panicked");
                controller.close();
                panic::resume_unwind(panic)
            }
        }
    });
    (stream, handle)
}

/// Run a synchronous producer to completion.
///
/// On failure the stream, already closed behind its error chunk, is returned
/// inside the error.
///
/// # Errors
///
/// Returns the producer's error as a [`CreateStreamError`].
pub fn create_assistant_stream_sync<F, E>(producer: F) -> Result<AssistantStream, CreateStreamError<E>>
where
    F: FnOnce(&AssistantStreamController) -> Result<(), E>,
    E: fmt::Debug + fmt::Display,
{
    create_assistant_stream_sync_with_config(StreamConfig::default(), producer)
}

/// [`create_assistant_stream_sync`] with an explicit configuration.
///
/// # Errors
///
/// Returns the producer's error as a [`CreateStreamError`].
pub fn create_assistant_stream_sync_with_config<F, E>(
    config: StreamConfig,
    producer: F,
) -> Result<AssistantStream, CreateStreamError<E>>
where
    F: FnOnce(&AssistantStreamController) -> Result<(), E>,
    E: fmt::Debug + fmt::Display,
{
    let (controller, stream) = AssistantStreamController::new(config);
    match finish(&controller, producer(&controller)) {
        Ok(()) => Ok(stream),
        Err(error) => Err(CreateStreamError { error, stream }),
    }
}

fn finish<E: fmt::Display>(controller: &AssistantStreamController, result: Result<(), E>) -> Result<(), E> {
    if let Err(e) = &result {
        warn!(error = %e, "AssistantStream: producer failed");
        if !controller.is_closed() {
            if let Err(enqueue_err) = controller.enqueue(Chunk::error(e.to_string())) {
                debug!(error = %enqueue_err, "AssistantStream: error chunk dropped");
            }
        }
    }
    controller.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_stream_core::{ChunkPayload, PartInit, StreamError, StreamResult};
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sync_success_closes() {
        let stream = create_assistant_stream_sync(|ctrl| -> Result<(), StreamError> {
            ctrl.append_text("hi")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            stream.collect_chunks().await.unwrap(),
            vec![
                Chunk::part_start(PartInit::text()),
                Chunk::text_delta("hi").at(vec![0]),
                Chunk::part_finish().at(vec![0]),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_failure_emits_one_error_chunk() {
        let err = create_assistant_stream_sync(|ctrl| {
            ctrl.append_text("partial").map_err(|e| e.to_string())?;
            Err("boom".to_string())
        })
        .unwrap_err();
        assert_eq!(err.error, "boom");

        let chunks = err.stream.collect_chunks().await.unwrap();
        let errors: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| matches!(c.payload, ChunkPayload::Error { .. }))
            .collect();
        assert_eq!(errors, vec![&Chunk::error("boom")]);
        assert!(chunks.contains(&Chunk::part_finish().at(vec![0])));
    }

    #[tokio::test]
    async fn test_sync_failure_after_close_skips_error_chunk() {
        let err = create_assistant_stream_sync(|ctrl| {
            ctrl.close();
            Err("late")
        })
        .unwrap_err();

        assert!(err.stream.collect_chunks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_async_success_closes() {
        let (stream, handle) = create_assistant_stream(|ctrl| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            ctrl.append_reasoning("thinking")?;
            Ok::<_, StreamError>(())
        });

        let chunks = stream.collect_chunks().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_async_failure_emits_error_chunk() {
        let (stream, handle) = create_assistant_stream(|ctrl| async move {
            ctrl.append_text("a").map_err(|e| e.to_string())?;
            Err::<(), _>("model unavailable".to_string())
        });

        let chunks = stream.collect_chunks().await.unwrap();
        assert!(chunks.contains(&Chunk::error("model unavailable")));
        assert_eq!(
            chunks
                .iter()
                .filter(|c| c.chunk_type() == "error")
                .count(),
            1
        );
        assert_eq!(handle.await.unwrap(), Err("model unavailable".to_string()));
    }

    #[tokio::test]
    async fn test_async_failure_after_source_failure_skips_error_chunk() {
        let (stream, handle) = create_assistant_stream(|ctrl| async move {
            ctrl.merge(stream::iter(vec![Err(StreamError::from_source("src boom"))]))
                .map_err(|e| e.to_string())?;
            while !ctrl.is_closed() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Err::<(), _>("producer boom".to_string())
        });

        let items: Vec<StreamResult<Chunk>> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(StreamError::Source(msg)) if msg == "src boom"));
        assert_eq!(handle.await.unwrap(), Err("producer boom".to_string()));
    }

    #[tokio::test]
    async fn test_async_manual_close_is_respected() {
        let (mut stream, handle) = create_assistant_stream(|ctrl| async move {
            ctrl.append_text("done")?;
            ctrl.close();
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, StreamError>(())
        });

        let mut count = 0;
        while let Some(chunk) = stream.next().await {
            chunk.unwrap();
            count += 1;
        }
        assert_eq!(count, 3);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_async_merge_of_nested_stream() {
        let (stream, handle) = create_assistant_stream(|ctrl| async move {
            let (inner, inner_handle) = create_assistant_stream(|nested| async move {
                nested.add_tool_call_part("lookup")?.set_result("found", false)?;
                Ok::<_, StreamError>(())
            });
            ctrl.append_text("before")?;
            ctrl.merge(inner)?;
            inner_handle.await.map_err(StreamError::from_err)??;
            Ok::<_, StreamError>(())
        });

        let chunks = stream.collect_chunks().await.unwrap();
        assert_eq!(
            chunks.iter().filter(|c| c.is_root_part_start()).count(),
            2
        );
        assert!(chunks
            .iter()
            .any(|c| c.chunk_type() == "result" && c.path == vec![1]));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_async_panic_closes_stream() {
        let (stream, handle) = create_assistant_stream(|ctrl| async move {
            ctrl.append_text("x")?;
            if ctrl.parent_id().is_none() {
                panic!("producer bug");
            }
            Ok::<_, StreamError>(())
        });

        let chunks = stream.collect_chunks().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(handle.await.unwrap_err().is_panic());
    }

    #[test]
    fn test_stream_type_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AssistantStream>();
        assert_send::<AssistantStreamController>();
    }
}
