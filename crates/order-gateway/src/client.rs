//! HTTP client for the order-management service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{OrderStatus, OrderSubmission};

/// Operations the dialogue engine needs from the order-management service.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a completed order. Returns the order code the service accepted.
    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, GatewayError>;

    /// Look up the status of an order by code.
    async fn query_order(&self, order_code: &str) -> Result<OrderStatus, GatewayError>;

    /// Cancel an order by code.
    async fn cancel_order(&self, order_code: &str) -> Result<(), GatewayError>;
}

/// [`OrderGateway`] backed by the service's JSON HTTP API.
#[derive(Clone)]
pub struct HttpOrderGateway {
    http: Client,
    config: GatewayConfig,
}

impl HttpOrderGateway {
    /// Create a gateway client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        info!(
            "Order gateway targeting {} (timeout {:?})",
            config.orders_url, config.timeout
        );

        Ok(Self { http, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Map a non-success response to an error.
    async fn check(&self, response: Response, order_code: &str) -> Result<Response, GatewayError> {
        let status = response.status();

        if status.as_u16() == self.config.not_found_status {
            return Err(GatewayError::NotFound(order_code.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Order service returned {} for {}", status, order_code);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, GatewayError> {
        debug!(
            "Submitting order {} with {} items",
            submission.order_code,
            submission.order_items.len()
        );

        let response = self
            .http
            .post(&self.config.orders_url)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // A submission has no "not found" outcome; every failure is retryable.
            let body = response.text().await.unwrap_or_default();
            warn!("Order service rejected {}: {}", submission.order_code, status);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Order {} submitted", submission.order_code);
        Ok(submission.order_code.clone())
    }

    async fn query_order(&self, order_code: &str) -> Result<OrderStatus, GatewayError> {
        debug!("Querying order {}", order_code);

        let response = self
            .http
            .get(&self.config.orders_url)
            .query(&[("order_code", order_code)])
            .send()
            .await?;

        let response = self.check(response, order_code).await?;
        let status = response
            .json::<OrderStatus>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(status)
    }

    async fn cancel_order(&self, order_code: &str) -> Result<(), GatewayError> {
        debug!("Cancelling order {}", order_code);

        let response = self
            .http
            .delete(&self.config.orders_url)
            .query(&[("order_code", order_code)])
            .send()
            .await?;

        self.check(response, order_code).await?;
        info!("Order {} cancelled", order_code);
        Ok(())
    }
}

impl std::fmt::Debug for HttpOrderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOrderGateway")
            .field("config", &self.config)
            .finish()
    }
}
