//! HTTP request handlers.

use axum::{extract::State, Extension, Json};

use crate::api::types::*;
use crate::domain::AuthenticatedIdentity;
use crate::error::GatewayResult;
use crate::AppState;

/// Health check endpoint.
///
/// GET /v1/health
#[utoipa::path(
    get,
    path = "/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ==================== User Endpoints ====================

/// Exchange an authenticated credential for a session token.
///
/// POST /v1/users/login
#[utoipa::path(
    post,
    path = "/v1/users/login",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Invalid init data"),
        (status = 500, description = "User could not be resolved")
    ),
    security(("authorization" = [])),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> GatewayResult<Json<LoginResponse>> {
    let token = state.sessions.issue(&identity)?;

    tracing::info!(
        user_id = identity.id,
        game_id = %identity.game_id,
        "User logged in"
    );

    Ok(Json(LoginResponse {
        token,
        user: identity.into(),
        expires_in: state.sessions.expires_in(),
    }))
}

/// Get the authenticated user.
///
/// GET /v1/users/me
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Current user info", body = UserInfo),
        (status = 401, description = "Not authenticated")
    ),
    security(("authorization" = [])),
    tag = "users"
)]
pub async fn get_current_user(
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Json<UserInfo> {
    Json(identity.into())
}
