//! Wire types of the order-management service.

use serde::{Deserialize, Serialize};

/// A line item in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub link: String,
    pub quantity: f64,
}

/// Body of an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmission {
    /// Customer display name.
    pub name: String,
    /// Channel identity of the customer.
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub phone: String,
    pub email: String,
    pub order_code: String,
    pub order_items: Vec<OrderLine>,
    pub note: String,
    pub address: String,
}

/// Response to an order lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_status: String,
}
