// src/main.rs
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod common;
mod logging_middleware;
mod services;
mod users;
mod verification;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::SessionIssuer;
use common::config::{env_opt, AppConfig};
use common::AppState;

fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(
                std::env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string())
                    .into(),
            ),
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Create the directory holding a file-backed SQLite database
async fn ensure_database_dir(database_url: &str) -> std::io::Result<()> {
    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Sentry must exist before the subscriber so its layer has a client
    let sentry_guard = init_sentry(env_opt("SENTRY_DSN").as_deref());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();

    if sentry_guard.is_some() {
        info!("Sentry initialized");
    }

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(
        app_url = %config.app_url,
        port = config.port,
        session = ?config.session,
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    ensure_database_dir(&config.database_url).await?;

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    if config.reset_db {
        warn!("RESET_DB is set: dropping all tables");
    }
    common::migrations::run_migrations(&pool, config.reset_db).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let mailer = services::build_sender(&config.email).await?;

    verification::spawn_expired_token_sweeper(pool.clone(), config.token_sweep_interval);
    info!(every = ?config.token_sweep_interval, "Expired token sweeper started");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let state = Arc::new(AppState {
        db: pool,
        http: http_client,
        app_url: config.app_url.clone(),
        sessions: SessionIssuer::new(config.session.clone()),
        password_params: config.password,
        oauth: config.oauth.clone(),
        guard: config.guard.clone(),
        mailer,
    });

    let app = app::build_router(state, &config.cors_origins, config.frontend_dir.as_deref());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
