use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gatectl", about = "CLI for the ComfyUI Image Gateway", version)]
struct Cli {
    /// Override GATEWAY_URL
    #[arg(global = true, long)]
    gateway_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a generation request and print the stored filenames
    Generate {
        /// Prompt text for the generation
        #[arg(long, value_name = "TEXT")]
        prompt: Option<String>,
        /// Width (gateway default: 512)
        #[arg(long)]
        width: Option<i64>,
        /// Height (gateway default: 768)
        #[arg(long)]
        height: Option<i64>,
        /// Print the full JSON response instead of one filename per line
        #[arg(long)]
        json: bool,
    },
    /// Image operations
    Image {
        #[command(subcommand)]
        cmd: ImageCmd,
    },
    /// Check gateway liveness
    Health,
}

#[derive(Subcommand, Debug)]
enum ImageCmd {
    /// Download a stored image by its generated name
    Get {
        /// Name returned by `generate`
        filename: String,
        /// Output path (defaults to ./<filename>)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let base = cli
        .gateway_url
        .or_else(|| std::env::var("GATEWAY_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
    let base = base.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Generate { prompt, width, height, json } => {
            let mut body = serde_json::Map::new();
            if let Some(p) = prompt {
                body.insert("prompt".to_string(), Value::String(p));
            }
            if let Some(w) = width {
                body.insert("width".to_string(), Value::from(w));
            }
            if let Some(h) = height {
                body.insert("height".to_string(), Value::from(h));
            }

            let response = client
                .post(format!("{}/generate", base))
                .json(&Value::Object(body))
                .send()
                .await?;
            let status = response.status();
            let payload: Value = response.json().await?;
            if !status.is_success() {
                let message = payload.get("error").and_then(|e| e.as_str()).unwrap_or("unknown error");
                eprintln!("Error: {}", message);
                std::process::exit(1);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if let Some(filenames) = payload.get("filenames").and_then(|f| f.as_array()) {
                for name in filenames {
                    if let Some(s) = name.as_str() {
                        println!("{}", s);
                    }
                }
            }
            Ok(())
        }
        Commands::Image { cmd } => match cmd {
            ImageCmd::Get { filename, out } => {
                let response = client.get(format!("{}/images/{}", base, filename)).send().await?;
                if !response.status().is_success() {
                    eprintln!("Error: {} for {}", response.status(), filename);
                    std::process::exit(1);
                }
                let bytes = response.bytes().await?;
                let path = out.unwrap_or_else(|| PathBuf::from(&filename));
                tokio::fs::write(&path, &bytes).await?;
                println!("Saved {} ({} bytes)", path.display(), bytes.len());
                Ok(())
            }
        },
        Commands::Health => {
            let response = client.get(format!("{}/", base)).send().await?;
            let status = response.status();
            let body = response.text().await?;
            println!("{} {}", status, body);
            if !status.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
