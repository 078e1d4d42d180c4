//! conversion-gate server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ admission gate ──────────────▶ handlers
//!                     (request id,    (rate limit → lockout →        (multipart →
//!                      body limit,     constant-time key compare)     upload checks →
//!                      timeout)                                       page ranges)
//!                                                                        │
//!                                                                        ▼
//!     Client Response ◀────────────── response mapping ◀──────── ConversionBackend
//!                                     (status, Retry-After,        (blocking pool)
//!                                      Content-Disposition)
//!
//!     Cross-cutting: config (TOML + env), observability (tracing, Prometheus),
//!                    lifecycle (signals, graceful shutdown, tracker sweeps)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use conversion_gate::config::{load_config, GateConfig};
use conversion_gate::lifecycle::{spawn_signal_listener, Shutdown};
use conversion_gate::observability::{logging, metrics};
use conversion_gate::{HttpServer, UnconfiguredBackend};

#[derive(Parser)]
#[command(name = "conversion-gate")]
#[command(about = "Admission gate in front of file-conversion endpoints", long_about = None)]
struct Args {
    /// TOML config file; defaults plus environment overrides when omitted
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "conversion-gate starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_window_secs = config.rate_limit.window_secs,
        rate_max_requests = config.rate_limit.max_requests,
        lockout_max_failures = config.lockout.max_failures,
        lockout_horizon_secs = config.lockout.horizon_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let signals = spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, Arc::new(UnconfiguredBackend));
    server.run(listener, shutdown.subscribe()).await?;

    signals.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}
