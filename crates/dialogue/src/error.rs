//! Error types for dialogue operations.

use database::DatabaseError;
use order_gateway::GatewayError;
use thiserror::Error;

/// Errors that can occur while handling a conversation step.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The order service call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The stored conversation does not allow this step.
    #[error("protocol violation: {0}")]
    Violation(String),

    /// Delivering a reply failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result type for dialogue operations.
pub type Result<T> = std::result::Result<T, DialogueError>;
