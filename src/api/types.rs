//! API request and response types.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::AuthenticatedIdentity;

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    /// Timestamp.
    pub timestamp: String,
}

// ==================== Users ====================

/// Login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Session token, presented later as `JWT:<token>`.
    pub token: String,
    /// User information.
    pub user: UserInfo,
    /// Token expiration in seconds, absent for non-expiring tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

/// User information.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    /// Host platform user ID.
    pub id: i64,
    /// Display name.
    pub display_name: String,
    /// Public game handle.
    pub game_id: String,
}

impl From<AuthenticatedIdentity> for UserInfo {
    fn from(identity: AuthenticatedIdentity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name,
            game_id: identity.game_id,
        }
    }
}
