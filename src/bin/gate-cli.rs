use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use conversion_gate::config::{load_config, UploadConfig};
use conversion_gate::pages;
use conversion_gate::uploads::{sanitize_filename, ExpectedKind, RawUpload, SecurityValidator};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Operator CLI for the conversion gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a config file
    CheckConfig { path: PathBuf },
    /// Expand a page-range expression
    Pages {
        expression: String,
        #[arg(short, long)]
        total: u32,
    },
    /// Show how an uploaded filename would be stored
    Sanitize {
        name: String,
        #[arg(long, default_value_t = UploadConfig::default().max_filename_len)]
        max_len: usize,
    },
    /// Run the upload checks against a local file
    Inspect {
        file: PathBuf,
        /// pdf, image, media, video or archive
        #[arg(short, long)]
        expect: ExpectedKind,
    },
    /// Query a running server's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { path } => {
            let config = load_config(&path)?;
            print_json(&json!({
                "bind_address": config.listener.bind_address,
                "rate_limit": { "window_secs": config.rate_limit.window_secs, "max_requests": config.rate_limit.max_requests },
                "lockout": { "max_failures": config.lockout.max_failures, "horizon_secs": config.lockout.horizon_secs },
                "uploads": {
                    "max_file_bytes": config.uploads.max_file_bytes,
                    "max_aggregate_bytes": config.uploads.max_aggregate_bytes,
                    "max_files": config.uploads.max_files,
                },
                "valid": true,
            }))?;
        }
        Commands::Pages { expression, total } => {
            let selection = pages::parse(&expression, total)?;
            print_json(&json!(selection))?;
        }
        Commands::Sanitize { name, max_len } => {
            println!("{}", sanitize_filename(&name, max_len));
        }
        Commands::Inspect { file, expect } => {
            let content = tokio::fs::read(&file).await?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let validator = SecurityValidator::new(UploadConfig::default());
            let upload = validator.validate(RawUpload::new(filename, content), expect)?;
            print_json(&json!({
                "declared_filename": upload.declared_filename(),
                "sanitized_filename": upload.sanitized_filename(),
                "kind": upload.detected_kind(),
                "bytes": upload.content().len(),
                "fingerprint": upload.fingerprint(),
            }))?;
        }
        Commands::Health { url } => {
            let res = reqwest::Client::new()
                .get(format!("{}/health", url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("unhealthy: {status}").into());
    }

    let json: Value = res.json().await?;
    print_json(&json)
}
