//! Gateway error types.
//!
//! Transport and provider failures are kept distinct: the settlement
//! engine treats them differently (a provider rejection is final, a
//! transport failure is retryable by the caller).

use thiserror::Error;

/// Errors from the QR payment provider boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Login with the configured service credentials failed.
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    /// The provider answered with its error envelope (`error != 0`).
    #[error("Provider rejected the request: {message}")]
    Provider { message: String },

    /// The request timed out.
    #[error("Provider request timed out")]
    Timeout,

    /// Network-level failure (DNS, connect, TLS, broken pipe).
    #[error("Provider transport error: {0}")]
    Transport(String),

    /// The provider answered 2xx but the body did not match the
    /// documented envelope.
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    /// Gateway configuration is incomplete or malformed.
    #[error("Invalid gateway configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
