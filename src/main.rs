use std::net::SocketAddr;
use std::sync::Arc;

use comfyui_image_gateway::{api, comfyui, config, storage, workflow};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    config::Config::dotenv_load();
    let config = config::Config::new().expect("Failed to load configuration");
    config::Config::print_env_vars();

    // Artifact store; the S3 backend creates its bucket here when missing.
    let store = storage::from_config(&config.storage)
        .await
        .expect("Failed to initialize artifact storage");

    let comfyui_client = comfyui::client::ComfyUIClient::new(
        config.comfyui_url.clone(),
        config.comfyui_ws_url.clone(),
        config.client_id.clone(),
    );

    let state = Arc::new(api::routes::AppState {
        workflow_builder: workflow::builder::WorkflowBuilder::from_config(&config),
        comfyui_client,
        store,
        generation_timeout: config.generation_timeout(),
    });

    let app = api::routes::router(state);

    // Run our application with safe parsing
    let host_str = config.api_host.clone();
    let port_str = config.api_port.clone();
    let ip: std::net::IpAddr = host_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid HOST '{}', falling back to 0.0.0.0", host_str);
        std::net::IpAddr::from([0, 0, 0, 0])
    });
    let port: u16 = port_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid PORT '{}', falling back to 3000", port_str);
        3000
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
