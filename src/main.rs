//! Edge API Gateway
//!
//! Single public entry point in front of internal HTTP services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::dispatcher ──▶ routing (RouteTable)
//!                                           │
//!                                           ▼
//!                                   http::middleware
//!                          logging → rate limit → authn → authz
//!                                           │ (short-circuit ⇒ respond)
//!                                           ▼
//!                      http::request (translate) ──▶ http::upstream ──▶ Backend
//!                                                                         │
//!     Client Response                                                     │
//!     ◀────────────── http::response (relay, 80 KiB chunks) ◀─────────────┘
//!
//!     Cross-cutting: config, security (token validation), observability,
//!                    lifecycle (startup / shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle::startup;
use edge_gateway::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", version, about = "Edge API gateway")]
struct Cli {
    /// Path to the TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), std::env::vars())?;
    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
