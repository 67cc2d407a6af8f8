//! Error types for the gateway.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::SessionError;

/// Error type for gateway operations outside the auth middleware.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Session token error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Log the actual error but don't expose internals
        tracing::error!(error = %self, "Request failed");

        let code = match &self {
            GatewayError::Session(_) => "TOKEN_ERROR",
            GatewayError::Config(_) => "CONFIG_ERROR",
        };

        let body = ErrorResponse {
            error: "An internal error occurred".to_string(),
            code: code.to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let response = GatewayError::Config("secret detail".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "CONFIG_ERROR");
        assert!(!body.to_string().contains("secret detail"));
    }
}
