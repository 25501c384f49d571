// src/main.rs
use anyhow::Context;
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod categories;
mod common;
mod health;
mod logging_middleware;
mod oauth;
mod profile;
mod users;

use auth::{AuthService, PasswordHasher, TokenIssuer};
use categories::CategoriesService;
use common::config::AppConfig;
use common::AppState;
use oauth::{OAuthService, ProviderRegistry};
use profile::{LocalAvatarStorage, ProfileService};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = Arc::new(AppConfig::from_env().context("invalid configuration")?);

    // ========================================================================
    // DIRECTORY SETUP
    // ========================================================================

    tokio::fs::create_dir_all(&config.upload.path)
        .await
        .with_context(|| format!("creating {}", config.upload.path.display()))?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
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

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .context("connecting to database")?;

    common::migrations::run_migrations(&pool, config.reset_db).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let hasher = PasswordHasher::new(config.password)?;
    let tokens = TokenIssuer::new(&config.jwt);
    let auth = Arc::new(AuthService::new(pool.clone(), hasher, tokens));
    info!("AuthService initialized");

    let registry = ProviderRegistry::from_config(&config.oauth)?;
    let oauth = Arc::new(OAuthService::new(pool.clone(), registry, auth.clone()));
    info!("OAuthService initialized");

    let storage = Arc::new(LocalAvatarStorage::new(config.upload.path.clone()));
    let profile = Arc::new(ProfileService::new(
        pool.clone(),
        storage,
        config.upload.clone(),
    ));
    info!("ProfileService initialized");

    let categories = Arc::new(CategoriesService::new(pool));
    info!("CategoriesService initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState {
        config: config.clone(),
        auth,
        oauth,
        profile,
        categories,
    });

    let app = app::build_router(shared);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
