//! Conversation state machine for the order intake bot.
//!
//! This crate provides the [`DialogueEngine`], which walks each user from a
//! product link to a submitted order (or through an order lookup or
//! cancellation), one inbound event at a time.
//!
//! # Flow
//!
//! ```text
//! GREETING ──link──▶ GET_LINK ──quantity──▶ GET_QUANTITY ──No──▶ GET_EMAIL
//!    ▲  │                                        │                  │
//!    │  │ Search / Cancel                        └──Yes──▶ GREETING │
//!    │  ▼                                                           ▼
//!    │ CHECK_ORDER / CANCEL_ORDER ──▶ GOODBYE ◀── GET_PHONE ◀── GET_NOTE ◀── GET_ADDRESS
//!    └────────────────────────────────────┘
//! ```
//!
//! Invalid input keeps the session where it is and repeats the question.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use dialogue::{DialogueEngine, SqliteStore};
//! use intake_core::InboundEvent;
//! use order_gateway::{GatewayConfig, HttpOrderGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:intake.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let gateway = HttpOrderGateway::new(GatewayConfig::from_env()?)?;
//!     let engine = DialogueEngine::new(SqliteStore::new(db), gateway);
//!
//!     let reply = engine.handle(&InboundEvent::text("1234567890", "hi")).await;
//!     println!("{}", reply.body());
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod locks;
pub mod prompts;
mod reaper;
mod sender;
mod store;

pub use engine::DialogueEngine;
pub use error::{DialogueError, Result};
pub use locks::{SenderGuard, SenderLocks};
pub use reaper::SessionReaper;
pub use sender::{LoggingSender, NoOpSender, RecordingSender, ReplySender};
pub use store::{ConversationStore, SqliteStore};
