//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user of the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Channel-supplied identity.
    pub id: String,
    /// Display name (empty if the channel never sent one).
    pub name: String,
    /// First contact.
    pub created_at: DateTime<Utc>,
    /// Last name refresh.
    pub updated_at: DateTime<Utc>,
}

/// Conversation state for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning user.
    pub user_id: String,
    /// Stored dialogue state (see `intake_core::DialogueState::as_str`).
    pub state: String,
    /// Link waiting for its quantity.
    pub pending_link: Option<String>,
    /// Quantity scratch field.
    pub pending_quantity: Option<f64>,
    /// Whether this is the user's live session.
    pub active: bool,
    /// Last time an event touched the session.
    pub last_activity: DateTime<Utc>,
}

/// An order being assembled before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning user.
    pub owner_id: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Delivery address.
    pub address: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
    /// Code assigned when the order is first submitted.
    pub order_code: Option<String>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A line item of an [`Order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Parent order.
    pub order_id: i64,
    /// Product link.
    pub link: String,
    /// Requested quantity.
    pub quantity: f64,
    /// Whether the item is part of the order.
    pub active: bool,
}

/// An order together with its active items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
