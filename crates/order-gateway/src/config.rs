//! Configuration for the order gateway.

use std::env;
use std::time::Duration;

use crate::error::GatewayError;

/// Default orders endpoint of the order-management service.
pub const DEFAULT_ORDERS_URL: &str = "http://localhost:8008/api/bot/orders";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default status code the service uses for an unknown order code.
pub const DEFAULT_NOT_FOUND_STATUS: u16 = 404;

/// Configuration for [`HttpOrderGateway`](crate::HttpOrderGateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Orders endpoint; submissions are POSTed here, lookups and
    /// cancellations add an `order_code` query parameter.
    pub orders_url: String,

    /// Timeout applied to every request.
    pub timeout: Duration,

    /// Status code that means "no order with this code".
    pub not_found_status: u16,

    /// Salt mixed into generated order codes.
    pub code_salt: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            orders_url: DEFAULT_ORDERS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            not_found_status: DEFAULT_NOT_FOUND_STATUS,
            code_salt: String::new(),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration for the given orders endpoint.
    pub fn new(orders_url: impl Into<String>) -> Self {
        Self {
            orders_url: orders_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the status code that means "order not found".
    pub fn with_not_found_status(mut self, status: u16) -> Self {
        self.not_found_status = status;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `ORDER_API_URL` - orders endpoint (default: http://localhost:8008/api/bot/orders)
    /// - `ORDER_API_TIMEOUT_SECS` - request timeout (default: 15)
    /// - `ORDER_API_NOT_FOUND_STATUS` - "not found" status code (default: 404)
    /// - `ORDER_CODE_SALT` - salt for order codes (default: empty)
    pub fn from_env() -> Result<Self, GatewayError> {
        let orders_url =
            env::var("ORDER_API_URL").unwrap_or_else(|_| DEFAULT_ORDERS_URL.to_string());

        if !orders_url.starts_with("http://") && !orders_url.starts_with("https://") {
            return Err(GatewayError::Configuration(format!(
                "ORDER_API_URL must be an http(s) URL, got {}",
                orders_url
            )));
        }

        let timeout = env::var("ORDER_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let not_found_status = match env::var("ORDER_API_NOT_FOUND_STATUS") {
            Ok(value) => value.parse().map_err(|_| {
                GatewayError::Configuration(format!(
                    "ORDER_API_NOT_FOUND_STATUS must be a status code, got {}",
                    value
                ))
            })?,
            Err(_) => DEFAULT_NOT_FOUND_STATUS,
        };

        let code_salt = env::var("ORDER_CODE_SALT").unwrap_or_default();

        Ok(Self {
            orders_url,
            timeout,
            not_found_status,
            code_salt,
        })
    }
}
