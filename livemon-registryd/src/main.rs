mod api;
mod config;
mod dns;
mod store;
mod store_manager;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dns::cloudflare::CloudflareApi;
use crate::store::table::ServiceTable;
use crate::store_manager::StoreHandle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("livemon_registryd=info")),
        )
        .init();

    tracing::info!("Starting livemon-registryd");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/livemon/registryd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);
    if config.zones.is_empty() {
        tracing::warn!("No DNS zones configured, failover endpoints will answer 404");
    }

    let table = ServiceTable::load(&config.store.path)?;
    tracing::info!("Loaded service table from {:?}", config.store.path);

    let store = StoreHandle::spawn(table, config.general.valid_period);

    let app_state = api::routes::AppState {
        store: store.clone(),
        dns: CloudflareApi::new(),
        config: Arc::new(config.clone()),
    };
    let app = api::routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");
    cancel.cancel();
    let _ = server_handle.await;

    if let Err(e) = store.shutdown().await {
        tracing::error!("Failed to shutdown store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
