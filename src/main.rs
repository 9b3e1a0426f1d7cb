//! Traffic controller gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │              TRAFFIC CONTROLLER              │
//!                  │                                              │
//!  Client Request  │  ┌──────┐   ┌───────────┐   ┌────────────┐  │
//!  ────────────────┼─▶│ http │──▶│ ratelimit │──▶│  routing   │  │
//!                  │  │server│   │ (window)  │   │ (matching) │  │
//!                  │  └──────┘   └───────────┘   └─────┬──────┘  │
//!                  │                                   ▼         │
//!                  │                          ┌───────────────┐  │
//!                  │                          │ load_balancer │  │
//!                  │                          │  (weighted)   │  │
//!                  │                          └───────┬───────┘  │
//!                  │                                  ▼          │
//!  Client Response │  ┌──────────┐   ┌────────────────────────┐  │
//!  ◀───────────────┼──│ error →  │◀──│ resilience             │◀─┼── Backend
//!                  │  │ status   │   │ (breaker + retries)    │  │
//!                  │  └──────────┘   └────────────────────────┘  │
//!                  │                                              │
//!                  │  config · observability · lifecycle          │
//!                  └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use traffic_controller::config::{load_config, GatewayConfig};
use traffic_controller::controller::TrafficController;
use traffic_controller::http::HttpServer;
use traffic_controller::invoker::HttpInvoker;
use traffic_controller::lifecycle::Shutdown;
use traffic_controller::observability::{logging, metrics, PrometheusSink};

#[derive(Parser)]
#[command(name = "traffic-controller", version, about = "Per-route traffic controller gateway")]
struct Cli {
    /// Path to the TOML config file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        strategy = ?config.selection.strategy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let controller = Arc::new(TrafficController::new(
        &config,
        Arc::new(HttpInvoker::new()),
        Arc::new(PrometheusSink),
    )?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config, controller);
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
