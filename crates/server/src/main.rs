// crates/server/src/main.rs
//! Strix server binary.
//!
//! Parses configuration, installs logging, and serves the scan API until
//! Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use strix_server::{create_app, AppState, Config};
use strix_server_jobs::ScanService;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,strix=info,strix_server=info,strix_server_jobs=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let driver_config = config.driver_config();
    tracing::debug!(?driver_config, "Scan driver configuration");

    let state = AppState::new(ScanService::in_memory(driver_config));
    let app = create_app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    eprintln!("\n\u{1f50e} Strix API v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening on http://{addr}");
    eprintln!("   POST   /api/scans              Start a scan");
    eprintln!("   GET    /api/scans              List all scans");
    eprintln!("   GET    /api/scans/{{id}}         Get scan status");
    eprintln!("   DELETE /api/scans/{{id}}         Delete a scan");
    eprintln!("   GET    /api/scans/{{id}}/report  Get scan report\n");
    tracing::info!(%addr, "Strix API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        // Without a signal handler, park forever rather than shutting down.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
