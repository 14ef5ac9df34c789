//! Client for the downstream order-management service.
//!
//! This crate packages a completed order into the service's HTTP protocol
//! and interprets its responses:
//!
//! - [`OrderGateway`] - the trait the dialogue engine calls (submit, query, cancel)
//! - [`HttpOrderGateway`] - the `reqwest` implementation with bounded timeouts
//! - [`OrderCodeGenerator`] - short order codes derived from the submission time
//! - [`ScriptedGateway`] - an in-memory gateway for tests
//!
//! # Example
//!
//! ```no_run
//! use order_gateway::{GatewayConfig, HttpOrderGateway, OrderGateway};
//!
//! # async fn example() -> Result<(), order_gateway::GatewayError> {
//! let gateway = HttpOrderGateway::new(GatewayConfig::from_env()?)?;
//!
//! match gateway.query_order("k3x9ab").await {
//!     Ok(status) => println!("status: {}", status.order_status),
//!     Err(e) if e.is_not_found() => println!("no such order"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod code;
mod config;
mod error;
mod mock;
mod types;

pub use client::{HttpOrderGateway, OrderGateway};
pub use code::{OrderCodeGenerator, ORDER_CODE_ALPHABET};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use mock::{ScriptedGateway, SCRIPTED_INITIAL_STATUS};
pub use types::{OrderLine, OrderStatus, OrderSubmission};

// Re-export async_trait for implementors
pub use async_trait::async_trait;
