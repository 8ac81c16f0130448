//! Completion detection over ComfyUI's WebSocket progress channel.
//!
//! ComfyUI pushes execution-status messages to every client subscribed with a
//! `clientId`. The channel is multiplexed: intermediate steps arrive as
//! `executing` messages naming the node being run, other message kinds report
//! queue state and previews, and traffic for other prompts shares the same
//! socket. The documented completion signal is the single `executing` message
//! whose `data.node` is null and whose `data.prompt_id` matches the submitted
//! job. Correctness rests on field matching alone, not message ordering, so
//! the loop discards everything else.
//!
//! The wait is capped by a configurable timeout so a hung engine fails the
//! request instead of pinning it; setting the timeout to zero removes the
//! cap.
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{AppError, AppResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the progress channel and block until `prompt_id` completes.
///
/// The socket is closed on every exit path. A channel error or a close
/// before the completion signal fails the request; so does exceeding
/// `timeout` when one is set.
pub async fn wait_for_completion(ws_url: &str, prompt_id: &str, timeout: Option<Duration>) -> AppResult<()> {
    tracing::debug!("Opening progress channel at {}", ws_url);
    let (mut socket, _) = connect_async(ws_url).await.map_err(AppError::WebSocket)?;

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, drain_until_complete(&mut socket, prompt_id)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ComfyUI(format!(
                "Timed out after {}s waiting for prompt {}",
                limit.as_secs(),
                prompt_id
            ))),
        },
        None => drain_until_complete(&mut socket, prompt_id).await,
    };

    let _ = socket.close(None).await;
    result
}

async fn drain_until_complete(socket: &mut WsStream, prompt_id: &str) -> AppResult<()> {
    while let Some(frame) = socket.next().await {
        let text = match frame.map_err(AppError::WebSocket)? {
            Message::Text(text) => text,
            // Binary frames carry step previews; the signal we want is JSON text.
            _ => continue,
        };
        let message: Value = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(_) => continue,
        };
        if is_completion(&message, prompt_id) {
            tracing::debug!("Prompt {} completed", prompt_id);
            return Ok(());
        }
    }
    Err(AppError::ComfyUI(format!(
        "Progress channel closed before prompt {} completed",
        prompt_id
    )))
}

fn is_completion(message: &Value, prompt_id: &str) -> bool {
    if message.get("type").and_then(|t| t.as_str()) != Some("executing") {
        return false;
    }
    let data = match message.get("data") {
        Some(data) => data,
        None => return false,
    };
    // A null or absent node means the whole prompt finished executing.
    data.get("node").map_or(true, Value::is_null)
        && data.get("prompt_id").and_then(|p| p.as_str()) == Some(prompt_id)
}
