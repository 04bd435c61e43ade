//! API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────────┐
//!                      │                       API GATEWAY                        │
//!                      │                                                          │
//!   Client Request     │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  │
//!   ───────────────────┼─▶│  fault   │─▶│ request  │─▶│   rate   │─▶│   size   │  │
//!                      │  │ barrier  │  │   log    │  │  limit   │  │  guard   │  │
//!                      │  └──────────┘  └──────────┘  └──────────┘  └────┬─────┘  │
//!                      │                                                 │        │
//!                      │                          ┌──────────────────────┤        │
//!                      │                          ▼                      ▼        │
//!                      │                   ┌─────────────┐       ┌─────────────┐  │
//!                      │                   │    docs     │       │   routing   │  │
//!                      │                   │ aggregator  │       │  + director │  │
//!                      │                   └──────┬──────┘       └──────┬──────┘  │
//!                      └──────────────────────────┼─────────────────────┼─────────┘
//!                                                 ▼                     ▼
//!                                          backend docs          backend service
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use api_gateway::config::load_config;
use api_gateway::lifecycle::{shutdown_signal, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::HttpServer;
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "api-gateway", version, about = "API gateway with a documentation aggregator")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.observability);

    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        public_prefix = %config.gateway.public_prefix,
        services = config.services.len(),
        requests_per_window = config.rate_limit.requests_per_window,
        window_secs = config.rate_limit.window_secs,
        max_body_size = config.security.max_body_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;

    let run = server.run(listener, &shutdown);
    tokio::pin!(run);
    tokio::select! {
        result = &mut run => result?,
        _ = shutdown_signal() => {
            shutdown.trigger();
            run.await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
