//! Visitor counter service entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │              VISITOR COUNTER                  │
//!                        │                                               │
//!     Client Request     │  ┌─────────┐    ┌──────────┐   ┌──────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│ counter  │──▶│ storage  │──┼──▶ Table
//!                        │  │ server  │    │   flow   │   │ backend  │  │    service
//!                        │  └─────────┘    └──────────┘   └──────────┘  │
//!                        │                                               │
//!                        │  ┌─────────────────────────────────────────┐  │
//!                        │  │          Cross-Cutting Concerns          │  │
//!                        │  │  ┌────────┐ ┌────────────┐ ┌──────────┐  │  │
//!                        │  │  │ config │ │ observa-   │ │ lifecycle│  │  │
//!                        │  │  │        │ │ bility     │ │          │  │  │
//!                        │  │  └────────┘ └────────────┘ └──────────┘  │  │
//!                        │  └─────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use visitor_counter::config::{load_config, CounterConfig};
use visitor_counter::http::HttpServer;
use visitor_counter::lifecycle::Shutdown;
use visitor_counter::observability;

#[derive(Parser)]
#[command(name = "visitor-counter")]
#[command(about = "Visitor counter HTTP service backed by table storage", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => CounterConfig::default(),
    };

    observability::logging::init_tracing(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        route = %config.http.route,
        backend = ?config.storage.backend,
        table = %config.storage.table,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = std::sync::Arc::new(Shutdown::new());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to install Ctrl+C handler");
                return;
            }
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
