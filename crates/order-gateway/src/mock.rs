//! Scripted in-memory gateway for tests and local runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::OrderGateway;
use crate::error::GatewayError;
use crate::types::{OrderStatus, OrderSubmission};

/// Status given to orders accepted by [`ScriptedGateway`].
pub const SCRIPTED_INITIAL_STATUS: &str = "pending";

#[derive(Debug, Default)]
struct Script {
    submit_failures: VecDeque<GatewayError>,
    query_failures: VecDeque<GatewayError>,
    cancel_failures: VecDeque<GatewayError>,
    submissions: Vec<OrderSubmission>,
    orders: HashMap<String, String>,
}

/// An [`OrderGateway`] that keeps orders in memory.
///
/// Accepted submissions are recorded and become queryable under their
/// order code. Failures can be queued per operation; each queued failure
/// is consumed by the next call.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next submission fail with `status`.
    pub fn fail_next_submit(&self, status: u16) {
        self.lock().submit_failures.push_back(GatewayError::Status {
            status,
            body: "scripted failure".to_string(),
        });
    }

    /// Make the next query fail with `error`.
    pub fn fail_next_query(&self, error: GatewayError) {
        self.lock().query_failures.push_back(error);
    }

    /// Make the next cancellation fail with `error`.
    pub fn fail_next_cancel(&self, error: GatewayError) {
        self.lock().cancel_failures.push_back(error);
    }

    /// Register an existing order.
    pub fn add_order(&self, order_code: &str, status: &str) {
        self.lock()
            .orders
            .insert(order_code.to_string(), status.to_string());
    }

    /// Submissions accepted so far.
    pub fn submissions(&self) -> Vec<OrderSubmission> {
        self.lock().submissions.clone()
    }

    /// Whether an order with this code is known.
    pub fn has_order(&self, order_code: &str) -> bool {
        self.lock().orders.contains_key(order_code)
    }
}

#[async_trait]
impl OrderGateway for ScriptedGateway {
    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, GatewayError> {
        let mut script = self.lock();
        if let Some(error) = script.submit_failures.pop_front() {
            return Err(error);
        }

        script.orders.insert(
            submission.order_code.clone(),
            SCRIPTED_INITIAL_STATUS.to_string(),
        );
        script.submissions.push(submission.clone());
        Ok(submission.order_code.clone())
    }

    async fn query_order(&self, order_code: &str) -> Result<OrderStatus, GatewayError> {
        let mut script = self.lock();
        if let Some(error) = script.query_failures.pop_front() {
            return Err(error);
        }

        script
            .orders
            .get(order_code)
            .map(|status| OrderStatus {
                order_status: status.clone(),
            })
            .ok_or_else(|| GatewayError::NotFound(order_code.to_string()))
    }

    async fn cancel_order(&self, order_code: &str) -> Result<(), GatewayError> {
        let mut script = self.lock();
        if let Some(error) = script.cancel_failures.pop_front() {
            return Err(error);
        }

        script
            .orders
            .remove(order_code)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(order_code.to_string()))
    }
}
