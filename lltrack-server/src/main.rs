//! lltrack-server: HTTP service for the LoadLock tracker
//!
//! Serves the unit list, status workflow, sample log and label upload API
//! plus the single-page UI.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lltrack_common::config::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT};
use lltrack_server::startup::{self, Bootstrap, Vision};
use lltrack_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for lltrack-server
#[derive(Parser, Debug)]
#[command(name = "lltrack-server")]
#[command(about = "LoadLock tracker HTTP service")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5001, or `port` from the config file)
    #[arg(short, long, env = "LLTRACK_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "LLTRACK_HOST")]
    host: String,

    /// Root folder holding the database, uploads and output
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default ~/.config/lltrack/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    startup::load_dotenv();
    startup::init_tracing("lltrack_server=info,lltrack_common=info,tower_http=info");

    info!(
        "Starting LoadLock tracker (lltrack-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let bootstrap =
        match Bootstrap::load(args.root_folder, args.config.as_deref(), Vision::Required).await {
            Ok(bootstrap) => bootstrap,
            Err(e) => {
                error!("{:#}", e);
                return Err(e);
            }
        };
    let ingestor = bootstrap.ingestor()?;

    let port = args
        .port
        .or(bootstrap.toml_config.port)
        .unwrap_or(DEFAULT_PORT);
    let max_upload_bytes = bootstrap
        .toml_config
        .max_upload_bytes
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    let state =
        AppState::new(bootstrap.pool.clone(), ingestor).with_max_upload_bytes(max_upload_bytes);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("lltrack-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    bootstrap.pool.close().await;
    info!("lltrack-server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
