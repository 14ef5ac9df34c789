//! HTTP ingestion surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dialogue::ConversationStore;
use intake_core::{InboundEvent, Reply};
use order_gateway::OrderGateway;
use serde::Serialize;
use thiserror::Error;

use crate::processor::{EventProcessor, ProcessResult};

/// Errors returned to the channel adapter.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The event was not processed.
    #[error("Rejected event: {0}")]
    Rejected(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Rejected(reason) => {
                tracing::warn!("Rejected event: {}", reason);
                (StatusCode::BAD_REQUEST, reason.clone())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

/// Health check endpoint.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Accept one inbound event and answer with its reply.
pub async fn receive_event<S, G>(
    State(processor): State<Arc<EventProcessor<S, G>>>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<Reply>, ApiError>
where
    S: ConversationStore + 'static,
    G: OrderGateway + 'static,
{
    match processor.process(&event).await {
        ProcessResult::Responded { reply, .. } => Ok(Json(reply)),
        ProcessResult::Skipped { reason } => Err(ApiError::Rejected(reason)),
    }
}

/// Build the router with all routes.
pub fn router<S, G>(processor: Arc<EventProcessor<S, G>>) -> Router
where
    S: ConversationStore + 'static,
    G: OrderGateway + 'static,
{
    Router::new()
        .route("/events", post(receive_event::<S, G>))
        .route("/health", get(health))
        .with_state(processor)
}
