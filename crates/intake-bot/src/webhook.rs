//! Reply delivery over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use dialogue::{DialogueError, ReplySender};
use intake_core::Reply;
use reqwest::Client;
use tracing::debug;

/// Posts each reply as JSON to a channel adapter.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    http: Client,
    url: String,
}

impl WebhookSender {
    /// Create a sender posting to `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DialogueError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DialogueError::SendFailed(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReplySender for WebhookSender {
    async fn send_reply(&self, reply: &Reply) -> Result<(), DialogueError> {
        let response = self
            .http
            .post(&self.url)
            .json(reply)
            .send()
            .await
            .map_err(|e| DialogueError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DialogueError::SendFailed(format!(
                "webhook returned {}",
                status
            )));
        }

        debug!("Delivered reply to {}", reply.recipient());
        Ok(())
    }
}
