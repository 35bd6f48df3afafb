//! # Gateway Configuration
//!
//! Provider credentials and endpoints, loaded from environment variables.
//! The two token headers are the provider's service credentials; the
//! callback URL is where the provider posts payment confirmations back
//! to our HTTP API.

use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Default token lifetime when the provider does not say (seconds).
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Configuration for the QR payment provider client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider API base URL, e.g. `https://api.pagofacil.example`.
    pub base_url: String,

    /// Service token identifier (sent as the `tcTokenService` header).
    pub token_service: String,

    /// Service token secret (sent as the `tcTokenSecret` header).
    pub token_secret: String,

    /// Public URL the provider calls back with payment confirmations.
    pub callback_url: String,

    /// Merchant client code included in QR generation requests.
    pub client_code: String,

    /// Timeout for the login request.
    pub auth_timeout: Duration,

    /// Timeout for QR generation and status queries.
    pub request_timeout: Duration,

    /// How long a cached access token is considered valid.
    pub token_ttl: Duration,
}

impl GatewayConfig {
    /// Creates a config with explicit credentials and default timeouts.
    pub fn new(
        base_url: impl Into<String>,
        token_service: impl Into<String>,
        token_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        GatewayConfig {
            base_url: base_url.into(),
            token_service: token_service.into(),
            token_secret: token_secret.into(),
            callback_url: callback_url.into(),
            client_code: String::new(),
            auth_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        }
    }

    /// Loads the configuration from environment variables.
    ///
    /// Required: `PAGOFACIL_BASE_URL`, `PAGOFACIL_TOKEN_SERVICE`,
    /// `PAGOFACIL_TOKEN_SECRET`, `PAGOFACIL_CALLBACK_URL`.
    /// Optional: `PAGOFACIL_CLIENT_CODE`, `PAGOFACIL_TOKEN_TTL_SECS`.
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = GatewayConfig::new(
            require_env("PAGOFACIL_BASE_URL")?,
            require_env("PAGOFACIL_TOKEN_SERVICE")?,
            require_env("PAGOFACIL_TOKEN_SECRET")?,
            require_env("PAGOFACIL_CALLBACK_URL")?,
        );

        if let Ok(code) = std::env::var("PAGOFACIL_CLIENT_CODE") {
            config.client_code = code;
        }
        if let Ok(ttl) = std::env::var("PAGOFACIL_TOKEN_TTL_SECS") {
            if let Ok(secs) = ttl.parse::<u64>() {
                config.token_ttl = Duration::from_secs(secs);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GatewayError::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.token_service.is_empty() || self.token_secret.is_empty() {
            return Err(GatewayError::Config(
                "provider credentials must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Returns a provider endpoint URL for the given path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn require_env(name: &str) -> GatewayResult<String> {
    std::env::var(name)
        .map_err(|_| GatewayError::Config(format!("missing environment variable {name}")))
}
