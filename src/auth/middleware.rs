//! Authentication middleware for axum.
//!
//! Reads the `Authorization` header once, picks the verification path from
//! its prefix, resolves the user through the directory and attaches an
//! [`AuthenticatedIdentity`] to the request extensions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::{
    AuthError, AuthRejection, InitDataOutcome, InitDataVerifier, Scheme, SessionTokenCodec,
};
use crate::domain::AuthenticatedIdentity;
use crate::storage::{DirectoryError, DirectoryResult, UserDirectory};

/// Header prefix of a platform-signed init-data credential.
pub const INIT_DATA_PREFIX: &str = "INIT_DATA:";
/// Header prefix of a session token credential.
pub const SESSION_TOKEN_PREFIX: &str = "JWT:";

/// Credential presented on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    InitData(&'a str),
    SessionToken(&'a str),
    Unrecognized,
}

impl<'a> Credential<'a> {
    /// Classify an `Authorization` header value by its prefix.
    pub fn from_header(value: Option<&'a str>) -> Self {
        let Some(value) = value else {
            return Credential::Unrecognized;
        };

        if let Some(raw) = value.strip_prefix(INIT_DATA_PREFIX) {
            Credential::InitData(raw)
        } else if let Some(raw) = value.strip_prefix(SESSION_TOKEN_PREFIX) {
            Credential::SessionToken(raw)
        } else {
            Credential::Unrecognized
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Credential::InitData(_) => Scheme::InitData,
            Credential::SessionToken(_) => Scheme::SessionToken,
            Credential::Unrecognized => Scheme::Unrecognized,
        }
    }
}

/// Test-mode substitution of a sentinel init-data credential.
///
/// Only constructed when the operator enables it in configuration.
#[derive(Clone)]
pub struct TestOverride {
    sentinel: String,
    replacement: String,
}

impl TestOverride {
    pub fn new(sentinel: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            replacement: replacement.into(),
        }
    }

    fn apply<'a>(&'a self, raw: &'a str) -> &'a str {
        if raw == self.sentinel {
            tracing::warn!("Test override credential substituted");
            &self.replacement
        } else {
            raw
        }
    }
}

/// Everything the middleware needs to authenticate a request.
pub struct Authenticator<D> {
    init_data: InitDataVerifier,
    sessions: SessionTokenCodec,
    directory: D,
    directory_timeout: Duration,
    test_override: Option<TestOverride>,
}

impl<D: UserDirectory> Authenticator<D> {
    pub fn new(
        init_data: InitDataVerifier,
        sessions: SessionTokenCodec,
        directory: D,
        directory_timeout: Duration,
    ) -> Self {
        Self {
            init_data,
            sessions,
            directory,
            directory_timeout,
            test_override: None,
        }
    }

    pub fn with_test_override(mut self, test_override: Option<TestOverride>) -> Self {
        self.test_override = test_override;
        self
    }

    /// Authenticate a raw `Authorization` header value.
    pub async fn authenticate(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedIdentity, AuthRejection> {
        let credential = Credential::from_header(header);
        let scheme = credential.scheme();

        let user = match credential {
            Credential::InitData(raw) => self.authenticate_init_data(raw).await,
            Credential::SessionToken(token) => self.authenticate_session(token).await,
            Credential::Unrecognized => Err(AuthError::MissingCredential),
        }
        .map_err(|error| AuthRejection::new(scheme, error))?;

        tracing::debug!(user_id = user.id, scheme = scheme.as_str(), "Request authenticated");
        Ok(user)
    }

    async fn authenticate_init_data(&self, raw: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let raw = match &self.test_override {
            Some(test_override) => test_override.apply(raw),
            None => raw,
        };

        let web_app_user = match self.init_data.verify(raw)? {
            InitDataOutcome::Valid(user) => user,
            InitDataOutcome::Invalid => return Err(AuthError::InvalidSignature),
        };
        tracing::debug!(
            user_id = web_app_user.id,
            username = ?web_app_user.username,
            "Init data verified"
        );

        let user = self
            .bounded(
                self.directory
                    .get_or_register(web_app_user.id, web_app_user.display_name()),
            )
            .await
            .map_err(|e| {
                // Registration failing is never a credential problem.
                AuthError::DirectoryUnavailable(e.to_string())
            })?;

        Ok(user.into())
    }

    async fn authenticate_session(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let session = self.sessions.validate(token)?;
        tracing::debug!(
            user_id = session.user_id,
            channels = ?session.claims.channels,
            "Session token verified"
        );
        let user = self.bounded(self.directory.get_by_id(session.user_id)).await?;
        Ok(user.into())
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = DirectoryResult<T>>,
    ) -> DirectoryResult<T> {
        tokio::time::timeout(self.directory_timeout, call)
            .await
            .map_err(|_| DirectoryError::Timeout)?
    }
}

/// Require a valid `INIT_DATA:` or `JWT:` credential.
pub async fn require_user<D: UserDirectory>(
    State(authenticator): State<Arc<Authenticator<D>>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let identity = authenticator.authenticate(header.as_deref()).await?;

    // Add the identity to request extensions for handlers to access
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        sign_init_data, DirectoryBehaviour, InMemoryDirectory, BOT_TOKEN, SESSION_SECRET,
    };

    fn authenticator(directory: InMemoryDirectory) -> Authenticator<InMemoryDirectory> {
        Authenticator::new(
            InitDataVerifier::new(BOT_TOKEN).unwrap(),
            SessionTokenCodec::new(SESSION_SECRET, Some(1)).unwrap(),
            directory,
            Duration::from_millis(200),
        )
    }

    fn init_data_for(id: i64) -> String {
        let user = format!(r#"{{"id":{id},"first_name":"Ana"}}"#);
        sign_init_data(&[("auth_date", "1700000000"), ("user", &user)], BOT_TOKEN)
    }

    #[test]
    fn test_credential_classification() {
        assert_eq!(Credential::from_header(None), Credential::Unrecognized);
        assert_eq!(
            Credential::from_header(Some("Bearer abc")),
            Credential::Unrecognized
        );
        assert_eq!(
            Credential::from_header(Some("INIT_DATA:a=1")),
            Credential::InitData("a=1")
        );
        assert_eq!(
            Credential::from_header(Some("JWT:abc.def.ghi")),
            Credential::SessionToken("abc.def.ghi")
        );
        // The marker must be a prefix.
        assert_eq!(
            Credential::from_header(Some("xJWT:abc")),
            Credential::Unrecognized
        );
    }

    #[tokio::test]
    async fn test_missing_header_makes_no_directory_calls() {
        let directory = InMemoryDirectory::default();
        let auth = authenticator(directory.clone());

        let rejection = auth.authenticate(None).await.unwrap_err();
        assert_eq!(rejection.scheme, Scheme::Unrecognized);
        assert!(matches!(rejection.error, AuthError::MissingCredential));
        assert_eq!(directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_init_data_registers_once() {
        let directory = InMemoryDirectory::default();
        let auth = authenticator(directory.clone());
        let header = format!("INIT_DATA:{}", init_data_for(42));

        let identity = auth.authenticate(Some(&header)).await.unwrap();
        assert_eq!(identity.id, 42);
        assert_eq!(identity.display_name, "Ana");
        assert_eq!(directory.register_calls(), vec![(42, "Ana".to_string())]);
        assert_eq!(directory.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_init_data_is_forbidden_without_directory_calls() {
        let directory = InMemoryDirectory::default();
        let auth = authenticator(directory.clone());
        let forged = init_data_for(42).replacen("1700000000", "1700000001", 1);

        let rejection = auth
            .authenticate(Some(&format!("INIT_DATA:{forged}")))
            .await
            .unwrap_err();
        assert!(matches!(rejection.error, AuthError::InvalidSignature));
        assert_eq!(rejection.status_code(), axum::http::StatusCode::FORBIDDEN);

        let rejection = auth
            .authenticate(Some("INIT_DATA:user=%zz"))
            .await
            .unwrap_err();
        assert!(matches!(rejection.error, AuthError::MalformedCredential(_)));
        assert_eq!(directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_registration_failure_is_server_error() {
        let directory = InMemoryDirectory::with_behaviour(DirectoryBehaviour::Failing);
        let auth = authenticator(directory);
        let header = format!("INIT_DATA:{}", init_data_for(42));

        let rejection = auth.authenticate(Some(&header)).await.unwrap_err();
        assert!(matches!(rejection.error, AuthError::DirectoryUnavailable(_)));
        assert_eq!(
            rejection.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_session_token_resolves_user() {
        let directory = InMemoryDirectory::default();
        let user = directory.insert(42, "Ana");
        let auth = authenticator(directory.clone());

        let token = auth.sessions.issue(&user.clone().into()).unwrap();
        let identity = auth.authenticate(Some(&format!("JWT:{token}"))).await.unwrap();

        assert_eq!(identity, AuthenticatedIdentity::from(user));
        assert_eq!(directory.lookup_calls(), 1);
        assert!(directory.register_calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_for_deleted_user_is_unauthorized() {
        let directory = InMemoryDirectory::default();
        let auth = authenticator(directory.clone());
        let ghost = AuthenticatedIdentity {
            id: 42,
            display_name: "Ghost".to_string(),
            game_id: "000000000000".to_string(),
        };
        let token = auth.sessions.issue(&ghost).unwrap();

        let rejection = auth
            .authenticate(Some(&format!("JWT:{token}")))
            .await
            .unwrap_err();
        assert!(matches!(rejection.error, AuthError::UnknownIdentity(42)));
        assert_eq!(rejection.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_session_token_skips_directory() {
        let directory = InMemoryDirectory::default();
        let auth = authenticator(directory.clone());

        let rejection = auth
            .authenticate(Some("JWT:not-a-token"))
            .await
            .unwrap_err();
        assert_eq!(rejection.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(directory.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_hanging_directory_times_out() {
        let directory = InMemoryDirectory::with_behaviour(DirectoryBehaviour::Hanging);
        let auth = authenticator(directory);
        let token = auth
            .sessions
            .issue(&AuthenticatedIdentity {
                id: 5,
                display_name: "Slow".to_string(),
                game_id: "abc".to_string(),
            })
            .unwrap();

        let rejection = auth
            .authenticate(Some(&format!("JWT:{token}")))
            .await
            .unwrap_err();
        assert!(matches!(rejection.error, AuthError::DirectoryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_override_only_when_configured() {
        let replacement = init_data_for(99);

        let directory = InMemoryDirectory::default();
        let plain = authenticator(directory.clone());
        let rejection = plain
            .authenticate(Some("INIT_DATA:TEST_TOKEN"))
            .await
            .unwrap_err();
        assert_eq!(rejection.status_code(), axum::http::StatusCode::FORBIDDEN);

        let overridden = authenticator(directory.clone())
            .with_test_override(Some(TestOverride::new("TEST_TOKEN", replacement)));
        let identity = overridden
            .authenticate(Some("INIT_DATA:TEST_TOKEN"))
            .await
            .unwrap();
        assert_eq!(identity.id, 99);

        // The sentinel is not honoured on the session path.
        let rejection = overridden
            .authenticate(Some("JWT:TEST_TOKEN"))
            .await
            .unwrap_err();
        assert_eq!(rejection.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
