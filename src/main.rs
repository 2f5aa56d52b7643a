//! Demo server with graceful shutdown.
//!
//! ```text
//! SIGINT/SIGTERM ──▶ ShutdownCoordinator ──▶ cleanup hook ──▶ ServeHandle::close ──▶ exit(0)
//!                          │
//!                          ├─▶ DrainLayer (new requests: 503 Connection: close)
//!                          └─▶ force timeout ──────────────────────────────────▶ exit(1)
//! ```
//!
//! Try `curl localhost:8080/slow`, then Ctrl+C: the slow request completes,
//! new requests are refused, and the process exits once it is done.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;

use graceful_shutdown::config::{load_config, ServiceConfig};
use graceful_shutdown::http::HttpServer;
use graceful_shutdown::lifecycle::{create_shutdown_layer, BoxError, ShutdownOptions};
use graceful_shutdown::observability::init_logging;

#[derive(Parser)]
#[command(name = "graceful-shutdown")]
#[command(about = "HTTP server that drains requests before exiting", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;

    tracing::info!("graceful-shutdown v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        force_timeout_ms = config.shutdown.force_timeout_ms,
        additional_signals = ?config.shutdown.additional_signals,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone());

    let options = ShutdownOptions::from_config(&config.shutdown)?.with_cleanup(|| async {
        tracing::info!("Running cleanup hook");
        Ok::<(), BoxError>(())
    });
    let drain = create_shutdown_layer(Arc::new(server.handle()), options)?;

    server.run(listener, app(), drain).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "Done"
            }),
        )
}
