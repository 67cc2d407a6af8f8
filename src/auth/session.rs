//! Session tokens issued after a successful login.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AuthenticatedIdentity;

/// Session tokens are signed with exactly this algorithm.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Broadcast channel every session is subscribed to.
const BROADCAST_CHANNEL: &str = "personal:broadcast";

/// Errors raised when issuing or validating session tokens.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session signing secret is not configured")]
    MissingSecret,

    #[error("session token lifetime must be a positive number of hours, got {0}")]
    InvalidTtl(i64),

    #[error("failed to sign session token: {0}")]
    Signing(String),

    #[error("session token is malformed: {0}")]
    Malformed(String),

    #[error("session token signature or algorithm is invalid")]
    InvalidSignature,

    #[error("session token is expired or not yet valid")]
    ExpiredOrNotYetValid,

    #[error("session token subject is not a user id: {0}")]
    InvalidSubject(String),
}

/// JWT claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Realtime channels the holder may subscribe to.
    pub channels: Vec<String>,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Not-before time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl SessionClaims {
    /// Channels derived from the identity, in a fixed order.
    pub fn channels_for(identity: &AuthenticatedIdentity) -> Vec<String> {
        vec![
            format!("personal:#{}", identity.id),
            format!("personal:#{}", identity.game_id),
            BROADCAST_CHANNEL.to_string(),
        ]
    }
}

/// Claims that passed validation, with the subject parsed.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user_id: i64,
    pub claims: SessionClaims,
}

/// Issues and validates HS256 session tokens.
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Token validity duration; `None` issues tokens without `exp`.
    token_ttl: Option<Duration>,
}

impl SessionTokenCodec {
    /// Create a codec with the given secret.
    ///
    /// An empty secret is refused so the service cannot start without one,
    /// as is a lifetime that is not positive or does not fit a `Duration`.
    pub fn new(secret: &str, token_ttl_hours: Option<i64>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }

        let token_ttl = token_ttl_hours
            .map(|hours| {
                Duration::try_hours(hours)
                    .filter(|ttl| *ttl > Duration::zero())
                    .ok_or(SessionError::InvalidTtl(hours))
            })
            .transpose()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        })
    }

    /// Token lifetime in seconds, if tokens expire.
    pub fn expires_in(&self) -> Option<i64> {
        self.token_ttl.map(|ttl| ttl.num_seconds())
    }

    /// Generate a session token for an authenticated identity.
    pub fn issue(&self, identity: &AuthenticatedIdentity) -> Result<String, SessionError> {
        let now = Utc::now();

        let exp = self
            .token_ttl
            .map(|ttl| {
                now.checked_add_signed(ttl)
                    .map(|at| at.timestamp())
                    .ok_or_else(|| SessionError::Signing("token expiry is out of range".to_string()))
            })
            .transpose()?;

        let claims = SessionClaims {
            sub: identity.id.to_string(),
            channels: SessionClaims::channels_for(identity),
            iat: now.timestamp(),
            exp,
            nbf: None,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Validate and decode a session token.
    pub fn validate(&self, token: &str) -> Result<ValidatedSession, SessionError> {
        // Only HS256 is listed, so `alg: none` or an asymmetric header never verifies.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token validation failed");
                match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        SessionError::InvalidSignature
                    }
                    ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                        SessionError::ExpiredOrNotYetValid
                    }
                    _ => SessionError::Malformed(e.to_string()),
                }
            })?;

        let claims = token_data.claims;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| SessionError::InvalidSubject(claims.sub.clone()))?;

        Ok(ValidatedSession { user_id, claims })
    }
}
