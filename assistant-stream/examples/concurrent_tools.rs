//! Concurrent tool calls example.
//!
//! Streams a short answer while two tool calls run side by side, then
//! prints every chunk as one JSON line.
//!
//! Run with:
//! ```bash
//! RUST_LOG=assistant_stream=debug cargo run --example concurrent_tools
//! ```

use assistant_stream::prelude::*;
use assistant_stream::SourcePart;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let (mut stream, handle) = create_assistant_stream(|ctrl| async move {
        ctrl.append_reasoning("Need the weather in two cities.")?;
        ctrl.append_text("Checking both cities now.")?;

        let paris = ctrl.add_tool_call_part("weather")?;
        let tokyo = ctrl.add_tool_call_part("weather")?;

        let slow = tokio::spawn(async move {
            tokyo.args_text().append(r#"{"city":"Tokyo"}"#)?;
            tokio::time::sleep(Duration::from_millis(40)).await;
            tokyo.set_result(json!({"temp": 27}), false)
        });

        paris.args_text().append(r#"{"city":"#)?;
        tokio::time::sleep(Duration::from_millis(10)).await;
        paris.args_text().append(r#""Paris"}"#)?;
        paris.set_result(json!({"temp": 18}), false)?;

        slow.await.map_err(StreamError::from_err)??;

        ctrl.append_source(SourcePart::url("src-1", "https://example.com/weather"))?;
        ctrl.append_text("Paris is 18°C, Tokyo is 27°C.")?;
        Ok::<_, StreamError>(())
    });

    while let Some(chunk) = stream.next().await {
        println!("{}", serde_json::to_string(&chunk?)?);
    }
    handle.await??;

    Ok(())
}
