//! Edge API Gateway
//!
//! A single entry point in front of replicated backend services, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                     EDGE GATEWAY                      │
//!                        │                                                       │
//!   Client Request       │  ┌─────────┐    ┌─────────┐    ┌──────────────┐       │
//!   ─────────────────────┼─▶│  http   │───▶│ routing │───▶│    auth      │       │
//!                        │  │ server  │    │  table  │    │ token check  │       │
//!                        │  └─────────┘    └────┬────┘    └──────┬───────┘       │
//!                        │                      │                │               │
//!                        │          /auth/*, /status, /metrics   ▼               │
//!                        │                      │         ┌──────────────┐       │
//!                        │                      ▼         │    cache     │       │
//!                        │              ┌────────────┐    │ (GET only)   │       │
//!                        │              │  handlers  │    └──────┬───────┘       │
//!                        │              └────────────┘           ▼               │
//!                        │                                ┌──────────────┐       │
//!                        │                                │load_balancer │       │
//!                        │                                │ round robin  │       │
//!                        │                                └──────┬───────┘       │
//!   Client Response      │                                       ▼               │
//!   ◀────────────────────┼──────────────────────────────── ┌──────────────┐      │
//!                        │                                 │   forward    │◀─────┼── Replica
//!                        │                                 └──────────────┘      │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::{self, schema::DEFAULT_JWT_SECRET};
use edge_gateway::lifecycle::{signals, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Edge API gateway with token auth, response caching and round-robin forwarding")]
struct Args {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("Using the default JWT secret; set GATEWAY_JWT_SECRET before deploying");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        groups = config.upstreams.len(),
        cache_ttl_secs = config.cache.ttl_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, metrics_handle)?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            // Server exited on its own, most likely an accept error.
            result??;
            return Ok(());
        }
        _ = signals::wait_for_signal() => shutdown.trigger(),
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
