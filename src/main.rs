//! FinExtract - structured data extraction for receipts, invoices and statements.
//!
//! One process is one session: uploads live in memory until shutdown.

mod api;
mod config;
mod export;
mod extractor;
mod gemini;
mod media;
mod orchestrator;
mod preview_store;
mod registry;
mod schema;
mod stats;
#[cfg(test)]
mod test_support;

use api::AppState;
use config::AppConfig;
use extractor::GeminiExtractor;
use orchestrator::Orchestrator;
use registry::Registry;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fin_extract=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let backend = GeminiExtractor::from_config(&config.gemini)?;
    info!(
        "Gemini extractor initialized (model={}, timeout={:?})",
        config.gemini.model, config.gemini.timeout
    );

    let orchestrator = Orchestrator::new(Registry::new(), Arc::new(backend));
    let app = api::router(AppState { orchestrator }, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Server listening on http://{}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Session ended");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
