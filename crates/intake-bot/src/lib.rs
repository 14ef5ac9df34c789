//! Order intake bot service.
//!
//! Wires the [`dialogue`] engine to the outside world:
//!
//! - [`server`] - `POST /events` accepts channel events, `GET /health`
//! - [`processor`] - per-event time budget and exactly one reply per event
//! - [`webhook`] - delivers replies to the channel adapter
//! - [`scheduler`] - runs the session reaper periodically
//! - [`config`] - environment configuration

pub mod config;
pub mod processor;
pub mod scheduler;
pub mod server;
pub mod webhook;

pub use config::{Config, ConfigError};
pub use processor::{EventProcessor, ProcessResult, DEFAULT_EVENT_TIMEOUT};
pub use webhook::WebhookSender;
