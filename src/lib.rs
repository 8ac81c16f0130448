//! ComfyUI Image Gateway library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `comfyui`: Client for ComfyUI REST endpoints, the WebSocket progress
//!   channel, and history output collection.
//! - `workflow`: Workflow template loading and per-request parameterization.
//! - `storage`: Artifact store trait with local-directory and S3 backends.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `ComfyUIClient`,
//! `WorkflowBuilder`, and `ArtifactStore`.
pub mod api;
pub mod comfyui;
pub mod config;
pub mod error;
pub mod storage;
pub mod workflow;

pub use comfyui::client::ComfyUIClient;
pub use config::Config;
pub use storage::ArtifactStore;
pub use workflow::builder::WorkflowBuilder;
