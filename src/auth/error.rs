//! Authentication failures and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{InitDataError, SessionError};
use crate::storage::DirectoryError;

/// Why a request could not be authenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no recognised credential was presented")]
    MissingCredential,

    #[error("credential could not be parsed: {0}")]
    MalformedCredential(String),

    #[error("credential signature is invalid")]
    InvalidSignature,

    #[error("credential is expired or not yet valid")]
    ExpiredOrNotYetValid,

    #[error("user {0} does not exist")]
    UnknownIdentity(i64),

    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl AuthError {
    /// Stable identifier used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential(_) => "malformed_credential",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredOrNotYetValid => "expired_or_not_yet_valid",
            AuthError::UnknownIdentity(_) => "unknown_identity",
            AuthError::DirectoryUnavailable(_) => "directory_unavailable",
        }
    }
}

impl From<InitDataError> for AuthError {
    fn from(e: InitDataError) -> Self {
        match e {
            InitDataError::Expired => AuthError::ExpiredOrNotYetValid,
            InitDataError::MalformedInput(msg) | InitDataError::MalformedIdentity(msg) => {
                AuthError::MalformedCredential(msg)
            }
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidSignature => AuthError::InvalidSignature,
            SessionError::ExpiredOrNotYetValid => AuthError::ExpiredOrNotYetValid,
            other => AuthError::MalformedCredential(other.to_string()),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(id) => AuthError::UnknownIdentity(id),
            other => AuthError::DirectoryUnavailable(other.to_string()),
        }
    }
}

/// Credential scheme selected from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    InitData,
    SessionToken,
    Unrecognized,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::InitData => "init_data",
            Scheme::SessionToken => "session_token",
            Scheme::Unrecognized => "unrecognized",
        }
    }
}

/// A rejected request: the failure plus the scheme it happened on.
#[derive(Debug)]
pub struct AuthRejection {
    pub scheme: Scheme,
    pub error: AuthError,
}

impl AuthRejection {
    pub fn new(scheme: Scheme, error: impl Into<AuthError>) -> Self {
        Self {
            scheme,
            error: error.into(),
        }
    }

    /// Directory failures are server errors; init-data rejections are 403,
    /// everything else 401.
    pub fn status_code(&self) -> StatusCode {
        match (&self.error, self.scheme) {
            (AuthError::DirectoryUnavailable(_), _) => StatusCode::INTERNAL_SERVER_ERROR,
            (_, Scheme::InitData) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Error body returned to clients. Carries no failure detail.
#[derive(Debug, Serialize)]
struct AuthErrorBody {
    error: &'static str,
    code: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                scheme = self.scheme.as_str(),
                kind = self.error.kind(),
                error = %self.error,
                "Authentication aborted"
            );
        } else {
            tracing::warn!(
                scheme = self.scheme.as_str(),
                kind = self.error.kind(),
                error = %self.error,
                "Authentication rejected"
            );
        }

        let body = match status {
            StatusCode::FORBIDDEN => AuthErrorBody {
                error: "Forbidden",
                code: "FORBIDDEN",
            },
            StatusCode::UNAUTHORIZED => AuthErrorBody {
                error: "Unauthorized",
                code: "UNAUTHORIZED",
            },
            _ => AuthErrorBody {
                error: "Could not resolve user",
                code: "INTERNAL_ERROR",
            },
        };

        (status, Json(body)).into_response()
    }
}
