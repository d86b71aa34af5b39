//! Thin request layer over the railscope analytics engine
//!
//! Loads one dataset snapshot at startup and serves the pure builders
//! behind a JSON API.

mod config;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use railscope_core::prelude::{DatasetConfig, load_dataset};

use crate::config::ServerConfig;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "railscope-server", about = "Passenger-flow analytics API")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Overrides the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let dataset = load_dataset(&DatasetConfig::new(&config.data_dir))?;
    info!(
        flows = dataset.report.flows_loaded,
        segments = dataset.report.segments_loaded,
        skipped = dataset.report.rows_skipped,
        "dataset loaded"
    );

    let state = Arc::new(AppState {
        dataset,
        od_top_n: config.od_top_n,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(bind = %config.bind, "railscope server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install shutdown handler");
    }
}
