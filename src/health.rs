use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tracing::info;

/// Liveness endpoint for hosting platforms that ping the bot to keep it
/// awake. Runs beside the pipeline; a failure here never stops ingestion.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let app = Router::new().route("/", get(index));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {}", addr))?;

    info!("Health endpoint listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("Health endpoint terminated")?;

    Ok(())
}

async fn index() -> &'static str {
    "Bot is alive."
}
