//! Event processor: runs the dialogue engine under a time budget and
//! delivers exactly one reply per accepted event.

use std::sync::Arc;
use std::time::Duration;

use dialogue::{prompts, ConversationStore, DialogueEngine, ReplySender};
use intake_core::{InboundEvent, Reply};
use order_gateway::OrderGateway;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Default processing budget for one event.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of processing a single event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// A reply was produced; `delivered` tells whether the sender accepted it.
    Responded { reply: Reply, delivered: bool },
    /// The event was not processed.
    Skipped { reason: String },
}

/// Feeds inbound events through a [`DialogueEngine`] and hands the replies
/// to a [`ReplySender`].
pub struct EventProcessor<S, G> {
    engine: Arc<DialogueEngine<S, G>>,
    sender: Arc<dyn ReplySender>,
    event_timeout: Duration,
}

impl<S, G> EventProcessor<S, G>
where
    S: ConversationStore,
    G: OrderGateway,
{
    /// Create a new processor.
    pub fn new(
        engine: Arc<DialogueEngine<S, G>>,
        sender: Arc<dyn ReplySender>,
        event_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            sender,
            event_timeout,
        }
    }

    /// Get a reference to the engine.
    pub fn engine(&self) -> &DialogueEngine<S, G> {
        &self.engine
    }

    /// Process one event.
    pub async fn process(&self, event: &InboundEvent) -> ProcessResult {
        if event.sender_id.trim().is_empty() {
            debug!("Skipping event without sender");
            return ProcessResult::Skipped {
                reason: "missing senderId".to_string(),
            };
        }

        info!("Processing {:?} event from {}", event.kind, event.sender_id);

        let reply = match timeout(self.event_timeout, self.engine.handle(event)).await {
            Ok(reply) => reply,
            Err(_elapsed) => {
                error!(
                    "Processing timed out for {} after {:?}",
                    event.sender_id, self.event_timeout
                );
                prompts::generic_error(&event.sender_id)
            }
        };

        let delivered = match self.sender.send_reply(&reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to deliver reply to {}: {}", reply.recipient(), e);
                false
            }
        };

        ProcessResult::Responded { reply, delivered }
    }
}
