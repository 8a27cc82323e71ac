//! Docserve
//!
//! Serves page images, text layers, search results and range streams for
//! documents fetched on demand from an origin store.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docserve::config::{Config, LookupConfig};
use docserve::document::{DocumentService, PopplerTools};
use docserve::lookup::{HttpLookup, ManifestLookup, ResourceLookup};
use docserve::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "docserve=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Docserve v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Cache directory: {}", config.cache.dir.display());

    DocumentService::init_dirs(&config.cache)
        .await
        .with_context(|| format!("Failed to create cache directories under {}", config.cache.dir.display()))?;

    let client = reqwest::Client::new();
    let lookup = build_lookup(&config.lookup, client.clone()).await?;
    let tools = Arc::new(PopplerTools::new(config.tools.clone()));

    let documents = DocumentService::new(
        &config.cache,
        config.render.clone(),
        client,
        lookup,
        tools,
    );
    let app = docserve::app(AppState::new(documents));

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Docserve listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn build_lookup(
    config: &LookupConfig,
    client: reqwest::Client,
) -> anyhow::Result<Arc<dyn ResourceLookup>> {
    match config {
        LookupConfig::Http { base_url } => {
            tracing::info!("Resource lookup: {}", base_url);
            Ok(Arc::new(HttpLookup::new(client, base_url.clone())))
        }
        LookupConfig::Manifest { path: Some(path) } => {
            let manifest = ManifestLookup::from_file(path)
                .await
                .with_context(|| format!("Failed to load manifest {}", path.display()))?;
            tracing::info!("Resource lookup: {} entries from {}", manifest.len(), path.display());
            Ok(Arc::new(manifest))
        }
        LookupConfig::Manifest { path: None } => {
            tracing::warn!("No LOOKUP_URL or LOOKUP_MANIFEST set; every identifier is unknown");
            Ok(Arc::new(ManifestLookup::new(HashMap::new())))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
