//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binary. Defaults are provided for convenience during development.
//! The struct is built once at startup and passed into components; nothing
//! reads the environment afterwards.
use std::env;
use std::time::Duration;

use dotenv;
use uuid::Uuid;

/// Well-known node identifiers inside the workflow template.
#[derive(Debug, Clone)]
pub struct NodeIds {
    pub text: String,
    pub latent_image: String,
    pub seed: String,
}

/// Artifact storage backend, chosen at startup. Only one is ever active.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        dir: String,
    },
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
    },
}

pub struct Config {
    pub comfyui_url: String,
    /// Progress channel override; derived from `comfyui_url` when unset.
    pub comfyui_ws_url: Option<String>,
    pub workflow_file: String,
    pub good_prompt: String,
    pub bad_prompt: String,
    pub characters_api_url: Option<String>,
    pub node_ids: NodeIds,
    pub api_host: String,
    pub api_port: String,
    pub generation_timeout_secs: u64,
    pub storage: StorageConfig,
    /// Process-lifetime session id correlating submissions with the progress
    /// channel. Generated once, never rotated.
    pub client_id: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Result<Self, env::VarError> {
        let storage = match env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string()).as_str() {
            "s3" => StorageConfig::S3 {
                endpoint: env::var("MINIO_URL").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string()),
                access_key: env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "admin".to_string()),
                secret_key: env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "admin123".to_string()),
                bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "meu-bucket".to_string()),
            },
            _ => StorageConfig::Local {
                dir: env::var("IMAGES_DIR").unwrap_or_else(|_| "./images".to_string()),
            },
        };

        Ok(Config {
            comfyui_url: env::var("COMFYUI_URL").unwrap_or_else(|_| "http://192.168.0.50:8188".to_string()),
            comfyui_ws_url: env::var("COMFYUI_WS_URL").ok(),
            workflow_file: env::var("WORKFLOW_FILE").unwrap_or_else(|_| "workflow.json".to_string()),
            good_prompt: env::var("GOOD_PROMPT").unwrap_or_else(|_| String::new()),
            bad_prompt: env::var("BAD_PROMPT").unwrap_or_else(|_| String::new()),
            characters_api_url: env::var("CHARACTERS_API_URL").ok(),
            node_ids: NodeIds {
                text: env::var("NODE_ID_TEXT").unwrap_or_else(|_| "6".to_string()),
                latent_image: env::var("NODE_ID_LATENT").unwrap_or_else(|_| "5".to_string()),
                seed: env::var("NODE_ID_SEED").unwrap_or_else(|_| "3".to_string()),
            },
            api_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()),
            generation_timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            storage,
            client_id: Uuid::new_v4().to_string(),
        })
    }

    /// Cap on the completion wait. `GENERATION_TIMEOUT_SECS=0` disables it
    /// and the wait becomes unbounded.
    pub fn generation_timeout(&self) -> Option<Duration> {
        match self.generation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn print_env_vars() {
        println!("COMFYUI_URL: {}", env::var("COMFYUI_URL").unwrap_or_else(|_| "<unset>".to_string()));
        println!("WORKFLOW_FILE: {}", env::var("WORKFLOW_FILE").unwrap_or_else(|_| "<unset>".to_string()));
        println!("STORAGE_BACKEND: {}", env::var("STORAGE_BACKEND").unwrap_or_else(|_| "<unset>".to_string()));
        println!("HOST: {}", env::var("HOST").unwrap_or_else(|_| "<unset>".to_string()));
        println!("PORT: {}", env::var("PORT").unwrap_or_else(|_| "<unset>".to_string()));
    }
}
