//! ComfyUI integration: HTTP client, progress channel, output collection.
pub mod client;
pub mod outputs;
pub mod progress;
