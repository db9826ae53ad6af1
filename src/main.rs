// =============================================================================
// RentScope — Main Entry Point
// =============================================================================
//
// Serves per-ZIP rental market statistics to the dashboard front end. Market
// data comes from the RentCast API (or a local proxy), is normalized, cached
// for seven days and exposed through a passphrase-gated JSON API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod cache;
mod error;
mod market;
mod rentcast;
mod runtime_config;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::cache::{FileStore, KvStore, MarketCache, MemoryStore};
use crate::market::MarketSource;
use crate::rentcast::RentcastClient;
use crate::runtime_config::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("RentScope starting up");

    let config_path =
        std::env::var("RENTSCOPE_CONFIG").unwrap_or_else(|_| "dashboard_config.json".into());
    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });
    config.apply_env_overrides();

    info!(zips = ?config.zips, base_url = %config.base_url, "Configured markets");

    // ── 2. Secrets (environment only) ────────────────────────────────────
    let api_key = std::env::var("RENTCAST_API_KEY").ok();
    if api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        info!("RENTCAST_API_KEY not set, requests go out without X-Api-Key (proxy mode)");
    }

    let passphrase = std::env::var("RENTSCOPE_PASSPHRASE").ok();
    if passphrase.as_deref().map_or(true, str::is_empty) {
        warn!("RENTSCOPE_PASSPHRASE not set, the dashboard API will refuse all requests");
    }

    // ── 3. Upstream client & cache ───────────────────────────────────────
    let client = Arc::new(RentcastClient::new(
        config.base_url.clone(),
        api_key,
        config.request_timeout(),
    )?);
    info!(base_url = %client.base_url(), "Upstream client ready");

    let store: Arc<dyn KvStore> = match (&config.cache_dir, config.cache_max_entries) {
        (Some(dir), _) => {
            let fs = FileStore::open(dir)
                .with_context(|| format!("failed to open cache directory {}", dir.display()))?;
            info!(dir = %fs.dir().display(), "Using on-disk market cache");
            Arc::new(fs)
        }
        (None, Some(limit)) => {
            info!(limit, "Using in-memory market cache with entry limit");
            Arc::new(MemoryStore::with_quota(limit))
        }
        (None, None) => {
            info!("Using in-memory market cache");
            Arc::new(MemoryStore::new())
        }
    };

    let markets = MarketCache::new(store, client);
    let state = Arc::new(AppState::new(config, markets, passphrase));

    // ── 4. Warm the cache for the configured ZIPs ────────────────────────
    let warm_state = state.clone();
    tokio::spawn(async move {
        let zips = warm_state.config.zips.clone();
        let loaded = warm_state.markets.fetch_many(&zips).await.len();
        if loaded == 0 && !zips.is_empty() {
            warn!(zips = ?zips, "Cache warm-up returned no data for any zip");
        } else {
            info!(requested = zips.len(), loaded, "Cache warm-up complete");
        }
    });

    // ── 5. API server ────────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("RentScope shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
