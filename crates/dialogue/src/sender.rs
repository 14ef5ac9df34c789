//! Reply sender trait and implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use intake_core::Reply;

use crate::error::DialogueError;

/// Trait for delivering replies to the messaging channel.
///
/// Abstracted to support different transports (webhook, logs, tests).
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Deliver one reply.
    async fn send_reply(&self, reply: &Reply) -> Result<(), DialogueError>;
}

/// A sender that discards all replies.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl ReplySender for NoOpSender {
    async fn send_reply(&self, _reply: &Reply) -> Result<(), DialogueError> {
        Ok(())
    }
}

/// A sender that logs every reply.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl ReplySender for LoggingSender {
    async fn send_reply(&self, reply: &Reply) -> Result<(), DialogueError> {
        let labels: Vec<&str> = reply.buttons().iter().map(|b| b.label.as_str()).collect();
        if labels.is_empty() {
            tracing::info!("Reply to {}: {}", reply.recipient(), reply.body());
        } else {
            tracing::info!(
                "Reply to {}: {} [{}]",
                reply.recipient(),
                reply.body(),
                labels.join(" | ")
            );
        }
        Ok(())
    }
}

/// A sender that keeps every reply in memory.
#[derive(Debug, Default)]
pub struct RecordingSender {
    replies: Mutex<Vec<Reply>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies delivered so far.
    pub fn replies(&self) -> Vec<Reply> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_reply(&self, reply: &Reply) -> Result<(), DialogueError> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(reply.clone());
        Ok(())
    }
}
