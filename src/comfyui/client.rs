//! Thin HTTP client for ComfyUI endpoints.
//!
//! - `queue_prompt` posts a workflow to `/prompt` and returns the job id.
//! - `get_history` fetches `/history/<prompt_id>` as JSON.
//! - `get_image` proxies to `/view?filename=...` and returns raw bytes.
//! - `wait_for_completion` blocks on the WebSocket progress channel.
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::comfyui::progress;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
    ws_url: String,
    client_id: String,
}

impl ComfyUIClient {
    /// `ws_url` overrides the progress channel endpoint; when `None` it is
    /// derived from `base_url` by swapping the scheme and appending `/ws`.
    pub fn new(base_url: String, ws_url: Option<String>, client_id: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        let ws = ws_url.unwrap_or_else(|| derive_ws_url(&base));
        ComfyUIClient {
            client: Client::new(),
            base_url: base,
            ws_url: ws.trim_end_matches('/').to_string(),
            client_id,
        }
    }

    /// Queue a workflow with ComfyUI.
    ///
    /// The request body pairs the prompt graph with the process's session id
    /// so progress messages can be correlated on the WebSocket. A response
    /// without a `prompt_id` is a fatal error for this request; there is no
    /// retry.
    pub async fn queue_prompt(&self, workflow: Value) -> AppResult<String> {
        let url = format!("{}/prompt", self.base_url);
        tracing::info!("Sending prompt to ComfyUI at URL: {}", url);
        tracing::debug!("Prompt payload: {:?}", workflow);

        let body = json!({ "prompt": workflow, "client_id": self.client_id });
        let response = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(AppError::HttpClient)?;
            let prompt_id = json
                .get("prompt_id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AppError::ComfyUI("Queue response did not include a prompt_id".to_string()))?;
            tracing::info!("Successfully queued prompt {}", prompt_id);
            Ok(prompt_id.to_string())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Failed to queue prompt. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::ComfyUI(error_message))
        }
    }

    /// Block until ComfyUI reports the prompt as finished, or until `timeout`
    /// elapses. See [`progress`] for the message protocol.
    pub async fn wait_for_completion(&self, prompt_id: &str, timeout: Option<Duration>) -> AppResult<()> {
        let url = format!("{}?clientId={}", self.ws_url, self.client_id);
        progress::wait_for_completion(&url, prompt_id, timeout).await
    }

    /// Retrieve the execution history for one prompt as pass-through JSON.
    pub async fn get_history(&self, prompt_id: &str) -> AppResult<Value> {
        let url = format!("{}/history/{}", self.base_url, prompt_id);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            response.json().await.map_err(AppError::HttpClient)
        } else {
            Err(AppError::ComfyUI(format!("Failed to get history for {}: {:?}", prompt_id, response.status())))
        }
    }

    /// Fetch image bytes via ComfyUI's `/view` endpoint.
    pub async fn get_image(&self, filename: &str, subfolder: &str, folder_type: &str) -> AppResult<Vec<u8>> {
        let url = format!("{}/view", self.base_url);
        let response = self.client.get(&url)
            .query(&[("filename", filename), ("subfolder", subfolder), ("type", folder_type)])
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            response.bytes().await.map(|b| b.to_vec()).map_err(AppError::HttpClient)
        } else {
            Err(AppError::ComfyUI(format!("Failed to get image {}: {:?}", filename, response.status())))
        }
    }
}

fn derive_ws_url(base_url: &str) -> String {
    let authority = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", base_url)
    };
    format!("{}/ws", authority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_is_derived_from_the_base_url() {
        let client = ComfyUIClient::new("http://192.168.0.50:8188/".to_string(), None, "cid".to_string());
        assert_eq!(client.ws_url, "ws://192.168.0.50:8188/ws");

        let client = ComfyUIClient::new("https://comfy.example".to_string(), None, "cid".to_string());
        assert_eq!(client.ws_url, "wss://comfy.example/ws");
    }

    #[test]
    fn ws_url_override_wins() {
        let client = ComfyUIClient::new(
            "http://a:1".to_string(),
            Some("ws://b:2/ws".to_string()),
            "cid".to_string(),
        );
        assert_eq!(client.ws_url, "ws://b:2/ws");
    }
}
