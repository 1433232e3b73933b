//! Immutable connection settings for one `ServiceClient`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_HOST: &str = "CRM_HOST";
pub const ENV_TOKEN: &str = "CRM_TOKEN";
pub const ENV_TIMEOUT_MS: &str = "CRM_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for `{key}`: `{value}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Host, bearer token and timeout for the remote CRM.
///
/// `host` is either a bare host name (`crm.example.com`, HTTPS implied) or a
/// full base URL with a scheme (`http://127.0.0.1:3000`).
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    host: String,
    token: SecretString,
    timeout: Duration,
}

impl ServiceConfig {
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        Self {
            host: host.trim().trim_end_matches('/').to_string(),
            token: SecretString::from(token.into()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from `CRM_HOST`, `CRM_TOKEN` and the optional `CRM_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(ENV_HOST).ok_or(ConfigError::MissingVar(ENV_HOST))?;
        let token = lookup(ENV_TOKEN).ok_or(ConfigError::MissingVar(ENV_TOKEN))?;

        let mut config = Self::new(&host, token);
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout_ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            config = config.with_timeout_ms(timeout_ms);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Validation("host must not be empty".to_string()));
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation("token must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation("timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scheme + host, without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("https://{}", self.host)
        }
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}
