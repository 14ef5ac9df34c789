//! Storage interface for the dialogue engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::{
    order, session, user, Database, OrderField, OrderItem, OrderWithItems, Result, Session,
    SessionUpdate, User,
};
use intake_core::DialogueState;

/// Durable state the dialogue engine reads and writes.
///
/// Methods that take a [`SessionUpdate`] apply it atomically together with
/// their own write.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create the user if absent and refresh the display name when given.
    async fn touch_user(&self, user_id: &str, name: Option<&str>, now: DateTime<Utc>)
        -> Result<()>;

    async fn user(&self, user_id: &str) -> Result<User>;

    async fn active_session(&self, user_id: &str) -> Result<Option<Session>>;

    /// Open a session, or return the active one if it already exists.
    ///
    /// A newly opened session never inherits an order from an earlier one.
    async fn open_session(
        &self,
        user_id: &str,
        state: DialogueState,
        now: DateTime<Utc>,
    ) -> Result<Session>;

    async fn save_session(&self, update: &SessionUpdate) -> Result<()>;

    async fn append_item(
        &self,
        owner_id: &str,
        link: &str,
        quantity: f64,
        update: &SessionUpdate,
    ) -> Result<OrderItem>;

    async fn set_order_field(
        &self,
        owner_id: &str,
        field: OrderField,
        value: &str,
        update: &SessionUpdate,
    ) -> Result<()>;

    async fn order_with_items(&self, owner_id: &str) -> Result<Option<OrderWithItems>>;

    /// Record the phone number and order code before submission.
    async fn stage_submission(
        &self,
        order_id: i64,
        phone: &str,
        order_code: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a submitted order.
    async fn commit_submission(&self, order_id: i64, update: &SessionUpdate) -> Result<()>;

    /// Deactivate sessions idle since before `cutoff`.
    async fn deactivate_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// [`ConversationStore`] backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn touch_user(
        &self,
        user_id: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        user::upsert_user(self.db.pool(), user_id, name, now).await
    }

    async fn user(&self, user_id: &str) -> Result<User> {
        user::get_user(self.db.pool(), user_id).await
    }

    async fn active_session(&self, user_id: &str) -> Result<Option<Session>> {
        session::get_active_session(self.db.pool(), user_id).await
    }

    async fn open_session(
        &self,
        user_id: &str,
        state: DialogueState,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        session::open_session(self.db.pool(), user_id, state.as_str(), now).await
    }

    async fn save_session(&self, update: &SessionUpdate) -> Result<()> {
        session::apply_update(self.db.pool(), update).await
    }

    async fn append_item(
        &self,
        owner_id: &str,
        link: &str,
        quantity: f64,
        update: &SessionUpdate,
    ) -> Result<OrderItem> {
        order::append_item(self.db.pool(), owner_id, link, quantity, update).await
    }

    async fn set_order_field(
        &self,
        owner_id: &str,
        field: OrderField,
        value: &str,
        update: &SessionUpdate,
    ) -> Result<()> {
        order::set_order_field(self.db.pool(), owner_id, field, value, update).await
    }

    async fn order_with_items(&self, owner_id: &str) -> Result<Option<OrderWithItems>> {
        order::get_order_with_items(self.db.pool(), owner_id).await
    }

    async fn stage_submission(
        &self,
        order_id: i64,
        phone: &str,
        order_code: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        order::stage_submission(self.db.pool(), order_id, phone, order_code, at).await
    }

    async fn commit_submission(&self, order_id: i64, update: &SessionUpdate) -> Result<()> {
        order::commit_submission(self.db.pool(), order_id, update).await
    }

    async fn deactivate_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        session::deactivate_stale_sessions(self.db.pool(), cutoff).await
    }
}
