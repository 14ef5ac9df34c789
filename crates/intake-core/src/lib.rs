//! Core types for the order intake bot.
//!
//! This crate provides the shared vocabulary used by every other crate in
//! the workspace:
//!
//! - [`InboundEvent`] / [`Reply`] - what arrives from and goes back to the
//!   messaging channel
//! - [`Postback`] - the opaque button payloads the bot hands out
//! - [`DialogueState`] - the states of the conversation and their legal successors
//! - [`validation`] - pure predicates classifying free text as a link,
//!   quantity, email, or phone number
//!
//! # Example
//!
//! ```rust
//! use intake_core::{validation, InboundEvent, Reply};
//!
//! let event = InboundEvent::text("1234567890", "https://shop.example.com/item/42");
//! assert!(validation::is_link(&event.payload));
//!
//! let reply = Reply::text(&event.sender_id, "How many would you like?");
//! assert_eq!(reply.recipient(), "1234567890");
//! ```

mod message;
mod state;
pub mod validation;

pub use message::{Button, EventKind, InboundEvent, Postback, Reply};
pub use state::DialogueState;
