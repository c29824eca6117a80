//! Exact-match reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                   GATEWAY                     │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!     ────────────────────┼─▶│   net   │───▶│   http   │───▶│ routing  │  │
//!                         │  │listener │    │ request  │    │  table   │  │
//!                         │  └─────────┘    └──────────┘    └────┬─────┘  │
//!                         │                       miss → 404     │ hit    │
//!                         │                                      ▼        │
//!     Client Response     │                 ┌──────────────────────────┐  │
//!     ◀───────────────────┼─────────────────│  forward (byte relay)    │◀─┼──── Upstream
//!                         │                 └──────────────────────────┘  │
//!                         │                                               │
//!                         │  admin API · config · logging · lifecycle     │
//!                         └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use route_gateway::config::{load_config, validation::validate_config, ConfigError, GatewayConfig, RouteConfig};
use route_gateway::lifecycle::{launch, signals::shutdown_signal};
use route_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "route-gateway", version)]
#[command(about = "Reverse-proxy gateway with exact (method, path) routing", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener host
    #[arg(long)]
    host: Option<String>,

    /// Override the listener port
    #[arg(short, long)]
    port: Option<i64>,

    /// Extra route, e.g. --route "GET /hello http://127.0.0.1:9000/api"
    #[arg(short, long = "route", value_name = "METHOD PATH TARGET", value_parser = parse_route)]
    routes: Vec<RouteConfig>,
}

fn parse_route(value: &str) -> Result<RouteConfig, String> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [method, path, target] => Ok(RouteConfig {
            method: method.to_string(),
            path: path.to_string(),
            target: target.to_string(),
        }),
        _ => Err(format!("expected \"METHOD PATH TARGET\", got {value:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(host) = args.host {
        config.listener.host = host;
    }
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    config.routes.extend(args.routes);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability.log_level);
    tracing::info!("route-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        routes = config.routes.len(),
        max_connections = config.listener.max_connections,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    let launched = launch(&config).await?;
    shutdown_signal().await;
    launched.shutdown().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
