//! Axum request handlers for the HTTP API.
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::routes::AppState;
use crate::comfyui::outputs;
use crate::error::AppResult;
use crate::workflow::builder::GenerationParams;

pub async fn root() -> &'static str {
    "API is running!"
}

fn default_width() -> i64 {
    512
}

fn default_height() -> i64 {
    768
}

/// Width and height are passed through to the engine unvalidated; ComfyUI
/// rejects values it cannot handle.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    #[serde(default = "default_width")]
    pub width: i64,
    #[serde(default = "default_height")]
    pub height: i64,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub filenames: Vec<String>,
    pub images: HashMap<String, Vec<String>>,
}

/// Run one generation end to end: parameterize the workflow, queue it, wait
/// for completion on the progress channel, then fetch and store every
/// produced image. Any failure along the way surfaces as a 500 with no
/// partial results, even when earlier images were already stored.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let mut workflow = state.workflow_builder.load().await?;
    let seed = state.workflow_builder.parameterize(
        &mut workflow,
        GenerationParams {
            prompt: request.prompt.as_deref(),
            width: Some(request.width),
            height: Some(request.height),
        },
    )?;
    tracing::debug!(seed, "Parameterized workflow");

    let prompt_id = state.comfyui_client.queue_prompt(workflow).await?;
    state
        .comfyui_client
        .wait_for_completion(&prompt_id, state.generation_timeout)
        .await?;

    let history = state.comfyui_client.get_history(&prompt_id).await?;

    let mut filenames = Vec::new();
    let mut images: HashMap<String, Vec<String>> = HashMap::new();
    for image in outputs::image_refs(&history, &prompt_id) {
        let bytes = state
            .comfyui_client
            .get_image(&image.filename, &image.subfolder, &image.kind)
            .await?;
        let stored_name = outputs::storage_name(&image.filename);
        state.store.put(&stored_name, &bytes).await?;
        filenames.push(stored_name.clone());
        images.entry(image.node_id).or_default().push(stored_name);
    }

    tracing::info!("Generation {} produced {} image(s)", prompt_id, filenames.len());
    Ok(Json(GenerateResponse { filenames, images }))
}

/// Serve a stored image back by its generated name.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = state.store.get(&filename).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
