//! Configuration module for the gateway.
//!
//! Loads configuration from YAML files and environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Authentication configuration.
///
/// Secrets are read once at startup and never mutated afterwards.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to sign and verify session tokens.
    pub session_secret: String,
    /// Bot token shared with the host platform, input to the init-data key derivation.
    pub bot_token: String,
    /// Session token lifetime. Tokens carry no `exp` claim when unset.
    #[serde(default)]
    pub token_ttl_hours: Option<i64>,
    /// Maximum accepted age of `auth_date` in init data. Unchecked when unset.
    #[serde(default)]
    pub init_data_max_age_secs: Option<u64>,
    /// Upper bound for a single user directory call.
    #[serde(default = "default_directory_timeout_ms")]
    pub directory_timeout_ms: u64,
    /// Operator-controlled substitution of a sentinel init-data credential.
    #[serde(default)]
    pub test_override: TestOverrideConfig,
}

// Secrets stay out of Debug output so they never reach the logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("init_data_max_age_secs", &self.init_data_max_age_secs)
            .field("directory_timeout_ms", &self.directory_timeout_ms)
            .field("test_override", &self.test_override)
            .finish()
    }
}

/// Test-mode credential override.
#[derive(Debug, Clone, Deserialize)]
pub struct TestOverrideConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    #[serde(default)]
    pub replacement: String,
}

fn default_directory_timeout_ms() -> u64 {
    5_000
}

fn default_sentinel() -> String {
    "TEST_TOKEN".to_string()
}

impl Default for TestOverrideConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sentinel: default_sentinel(),
            replacement: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (GATEWAY__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with GATEWAY prefix
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
