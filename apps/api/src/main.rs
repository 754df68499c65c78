mod ai;
mod config;
mod db;
mod errors;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::clients::{build_http_client, Attribution, Endpoints, GenerationParams};
use crate::ai::store::{InMemorySettingsStore, PgSettingsStore, SettingsStore};
use crate::ai::{ConfigCache, HttpBackend};
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerHub API v{}", env!("CARGO_PKG_VERSION"));

    // Settings store: Postgres when configured, otherwise process memory
    let store: Arc<dyn SettingsStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgSettingsStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; AI settings are kept in memory and lost on restart");
            Arc::new(InMemorySettingsStore::new())
        }
    };

    let settings = Arc::new(ConfigCache::new(store, config.default_provider_config()));

    // Initialize provider backend
    let http = build_http_client(Duration::from_secs(config.ai_timeout_secs))?;
    let backend = Arc::new(HttpBackend::new(
        http,
        Endpoints::default(),
        Attribution {
            referer: config.app_url.clone(),
            title: config.app_name.clone(),
        },
        GenerationParams::default(),
    ));
    info!(
        "AI backend initialized (timeout: {}s)",
        config.ai_timeout_secs
    );

    let state = AppState::new(settings, backend);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to APP_URL once the front-end origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
