// src/main.rs
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod common;
mod logging_middleware;
mod users;
mod workshops;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::{GoogleKeyCache, GoogleTokenVerifier, HttpKeySource, SessionKeys};
use common::{db, migrations, AppState, Settings};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let settings = Settings::from_env()?;
    info!(
        env = settings.app_env.as_str(),
        debug = settings.debug,
        database_url = %settings.database_url,
        "Configuration loaded"
    );

    if settings.google_audiences.is_empty() {
        warn!("GOOGLE_CLIENT_ID / GOOGLE_IOS_CLIENT_ID not set: every Google sign-in will be rejected");
    }

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    let pool = db::connect(&settings.database_url).await?;
    migrations::run_migrations(&pool, settings.reset_db).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;

    let key_source = Arc::new(HttpKeySource::new(http_client, settings.google_certs_url.clone()));
    let key_cache = Arc::new(GoogleKeyCache::new(key_source, settings.google_certs_refresh));

    // Sign-in still works if this fails: the first verification retries the fetch
    if let Err(e) = key_cache.refresh().await {
        warn!(error = %e, "Initial Google signing key fetch failed");
    }
    key_cache.clone().spawn_refresh_task();
    info!("Google key refresh task started");

    let google = GoogleTokenVerifier::new(key_cache, &settings);
    let sessions = SessionKeys::from_settings(&settings);

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let port = settings.port;
    let state = Arc::new(AppState {
        db: pool,
        settings: Arc::new(settings),
        google: Arc::new(google),
        sessions: Arc::new(sessions),
    });

    let app = app::build_router(state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
