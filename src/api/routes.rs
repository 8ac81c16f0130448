//! Router assembly and shared request state.
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::comfyui::client::ComfyUIClient;
use crate::storage::ArtifactStore;
use crate::workflow::builder::WorkflowBuilder;

/// Immutable per-process state shared by every request.
pub struct AppState {
    pub workflow_builder: WorkflowBuilder,
    pub comfyui_client: ComfyUIClient,
    pub store: Arc<dyn ArtifactStore>,
    pub generation_timeout: Option<Duration>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/generate", post(handlers::generate))
        .route("/images/:filename", get(handlers::serve_image))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
