//! Verification of signed mini-app init data.
//!
//! The host platform signs the launch parameters it hands to the web app.
//! The signing key is `HMAC-SHA256("WebAppData", bot_token)` and the signed
//! message is the sorted, newline-joined `key=value` lines of every field
//! except `hash`.

use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";
const USER_FIELD: &str = "user";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Allowed clock drift for `auth_date` values ahead of the local clock.
const AUTH_DATE_LEEWAY_SECS: i64 = 60;

/// Errors raised while verifying init data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data is not a valid query string: {0}")]
    MalformedInput(String),

    #[error("signed user object could not be decoded: {0}")]
    MalformedIdentity(String),

    #[error("init data auth_date is outside the accepted window")]
    Expired,
}

/// User object embedded in the `user` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl WebAppUser {
    pub fn display_name(&self) -> &str {
        &self.first_name
    }
}

/// Result of a verification that got as far as comparing signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitDataOutcome {
    /// Signature matched and the embedded user decoded.
    Valid(WebAppUser),
    /// Signature mismatch or no `hash` field.
    Invalid,
}

/// Verifies init data against a bot token.
///
/// The derived secret key is computed once; the verifier is immutable and
/// cheap to clone across request handlers.
#[derive(Clone)]
pub struct InitDataVerifier {
    keyed: HmacSha256,
    max_age_secs: Option<u64>,
}

impl InitDataVerifier {
    /// Derive the signing key from the bot token.
    pub fn new(bot_token: &str) -> Result<Self, hmac::digest::InvalidLength> {
        let mut derive = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)?;
        derive.update(bot_token.as_bytes());
        let secret_key = derive.finalize().into_bytes();

        Ok(Self {
            keyed: HmacSha256::new_from_slice(&secret_key)?,
            max_age_secs: None,
        })
    }

    /// Reject payloads whose `auth_date` is older than `max_age_secs`.
    pub fn with_max_age(mut self, max_age_secs: Option<u64>) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Verify a raw query string as delivered by the host platform.
    pub fn verify(&self, raw: &str) -> Result<InitDataOutcome, InitDataError> {
        let fields = parse_query(raw)?;

        let Some(hash) = fields.get(HASH_FIELD) else {
            return Ok(InitDataOutcome::Invalid);
        };

        if !self.signature_matches(&data_check_string(&fields), hash) {
            return Ok(InitDataOutcome::Invalid);
        }

        if let Some(max_age) = self.max_age_secs {
            check_auth_date(&fields, max_age)?;
        }

        let user = fields
            .get(USER_FIELD)
            .ok_or_else(|| InitDataError::MalformedIdentity("missing user field".to_string()))?;
        let user: WebAppUser = serde_json::from_str(user)
            .map_err(|e| InitDataError::MalformedIdentity(e.to_string()))?;

        Ok(InitDataOutcome::Valid(user))
    }

    /// Lower-hex signature of a data-check string.
    #[cfg(test)]
    pub(crate) fn sign(&self, data_check_string: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signature_matches(&self, data_check_string: &str, hash: &str) -> bool {
        // Only canonical lower-hex is accepted, so the comparison stays case-sensitive.
        let lower_hex = hash.len() == 64
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !lower_hex {
            return false;
        }
        let Ok(expected) = hex::decode(hash) else {
            return false;
        };

        let mut mac = self.keyed.clone();
        mac.update(data_check_string.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

/// Decode a form-urlencoded string; the first value of a repeated key wins.
pub fn parse_query(raw: &str) -> Result<HashMap<String, String>, InitDataError> {
    validate_query(raw)?;

    let mut fields = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    Ok(fields)
}

// form_urlencoded is lenient: it accepts bad escapes and replaces invalid
// UTF-8 with U+FFFD. Reject both so the signed text is exactly what was sent.
fn validate_query(raw: &str) -> Result<(), InitDataError> {
    if raw.contains(';') {
        return Err(InitDataError::MalformedInput(
            "invalid semicolon separator".to_string(),
        ));
    }

    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .and_then(|e| hex::decode(e).ok())
                    .and_then(|d| d.first().copied())
                    .ok_or_else(|| {
                        InitDataError::MalformedInput(format!("invalid percent escape at byte {i}"))
                    })?;
                decoded.push(byte);
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    // Separators are ASCII, so checking the whole buffer checks every key and value.
    std::str::from_utf8(&decoded)
        .map_err(|e| InitDataError::MalformedInput(format!("decoded text is not UTF-8: {e}")))?;
    Ok(())
}

/// Sorted, newline-joined `key=value` lines of every field except `hash`.
///
/// Lines are sorted on the whole `key=value` text, not on the key alone.
pub fn data_check_string(fields: &HashMap<String, String>) -> String {
    let mut lines: Vec<String> = fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    lines.sort();
    lines.join("\n")
}

fn check_auth_date(fields: &HashMap<String, String>, max_age_secs: u64) -> Result<(), InitDataError> {
    let auth_date: i64 = fields
        .get(AUTH_DATE_FIELD)
        .and_then(|v| v.parse().ok())
        .ok_or(InitDataError::Expired)?;

    let now = Utc::now().timestamp();
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);

    if auth_date > now + AUTH_DATE_LEEWAY_SECS || now.saturating_sub(auth_date) > max_age {
        return Err(InitDataError::Expired);
    }
    Ok(())
}
