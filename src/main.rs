//! Mini App Gateway - authentication front door for mini-app backends.
//!
//! Admits requests carrying either platform-signed init data or a session
//! token issued by this service, and resolves the caller to a user record.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePool;
use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod logging;
mod storage;
#[cfg(test)]
mod testing;

use crate::api::build_router;
use crate::auth::{Authenticator, InitDataVerifier, SessionTokenCodec, TestOverride};
use crate::config::Config;
use crate::error::{GatewayError, GatewayResult};
use crate::storage::SqliteUserDirectory;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session token codec for login.
    pub sessions: SessionTokenCodec,
    /// Database pool, used for health checks.
    pub pool: SqlitePool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init();

    tracing::info!("Starting Mini App Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url,
        auth = ?config.auth,
        "Configuration loaded"
    );

    // Connect to database
    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    let directory = SqliteUserDirectory::new(pool.clone());
    directory.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!("Database connected and schema initialized");

    let (sessions, authenticator) = build_auth(&config, directory)?;

    let state = AppState { sessions, pool };
    let app = build_router(state, Arc::new(authenticator));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the authentication components from configuration.
///
/// Missing secrets fail here, before the server accepts any request.
fn build_auth(
    config: &Config,
    directory: SqliteUserDirectory,
) -> GatewayResult<(SessionTokenCodec, Authenticator<SqliteUserDirectory>)> {
    let auth = &config.auth;

    if auth.bot_token.is_empty() {
        return Err(GatewayError::Config("auth.bot_token is not set".to_string()));
    }

    let sessions = SessionTokenCodec::new(&auth.session_secret, auth.token_ttl_hours)
        .map_err(|e| GatewayError::Config(e.to_string()))?;
    let init_data = InitDataVerifier::new(&auth.bot_token)
        .map_err(|e| GatewayError::Config(e.to_string()))?
        .with_max_age(auth.init_data_max_age_secs);

    let test_override = if auth.test_override.enabled {
        tracing::warn!(
            sentinel = %auth.test_override.sentinel,
            "Test credential override is ENABLED - never enable in production"
        );
        Some(TestOverride::new(
            auth.test_override.sentinel.clone(),
            auth.test_override.replacement.clone(),
        ))
    } else {
        None
    };

    let authenticator = Authenticator::new(
        init_data,
        sessions.clone(),
        directory,
        Duration::from_millis(auth.directory_timeout_ms),
    )
    .with_test_override(test_override);

    Ok((sessions, authenticator))
}
