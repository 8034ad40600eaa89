//! credo-server: HTTP surface for the credit decision orchestrator.

mod config;
mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use credo_runtime::providers::InMemoryDirectory;
use credo_runtime::Orchestrator;

use crate::config::ServerConfig;
use crate::routes::AppState;

#[derive(Parser, Debug)]
#[command(name = "credo-server", about = "Multi-agent credit decision orchestrator")]
struct Args {
    /// Path to a YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config.
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    // Demo directory: production deployments implement the provider
    // traits against their own invoice/buyer/merchant stores.
    let directory = Arc::new(InMemoryDirectory::with_demo_data());
    let orchestrator = Arc::new(Orchestrator::with_directory(
        directory,
        config.runtime.clone(),
    ));

    let state = AppState {
        orchestrator,
        sync_wait: config.sync_wait,
    };

    let app = Router::new()
        .route("/agents/analyze", post(routes::analyze))
        .route("/agents/status/{session_id}", get(routes::status))
        .route("/agents/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!(listen = %config.listen, "credo-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
