//! Error types for order gateway operations.

use thiserror::Error;

/// Errors that can occur when talking to the order-management service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service has no order with this code.
    #[error("order not found: {0}")]
    NotFound(String),

    /// The request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with an unexpected status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether the service reported the order as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Timeout | GatewayError::Decode(_) => true,
            GatewayError::Status { .. } => true,
            GatewayError::NotFound(_) | GatewayError::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}
