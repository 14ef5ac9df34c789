//! In-progress order (aggregate) storage.
//!
//! Each user has at most one in-progress order. Every write that the
//! conversation makes to an order is paired with the session update for the
//! same step and committed in one transaction, so a failed step leaves both
//! the order and the session as they were.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Order, OrderItem, OrderWithItems};
use crate::session::{self, SessionUpdate};

/// Order fields filled from free text during the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    /// Contact email.
    Email,
    /// Delivery address.
    Address,
    /// Free-text note.
    Note,
}

impl OrderField {
    /// Get the database column name for this field.
    pub fn column_name(&self) -> &'static str {
        match self {
            OrderField::Email => "email",
            OrderField::Address => "address",
            OrderField::Note => "note",
        }
    }
}

/// Add an item to the user's order, creating the order if needed, and
/// apply the accompanying session update.
pub async fn append_item(
    pool: &SqlitePool,
    owner_id: &str,
    link: &str,
    quantity: f64,
    update: &SessionUpdate,
) -> Result<OrderItem> {
    let mut tx = pool.begin().await?;

    session::apply_update(&mut *tx, update).await?;

    let order_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO orders (owner_id, created_at, updated_at)
        VALUES (?1, ?2, ?2)
        ON CONFLICT(owner_id) DO UPDATE SET
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(update.at)
    .fetch_one(&mut *tx)
    .await?;

    let item = sqlx::query_as::<_, OrderItem>(
        r#"
        INSERT INTO order_items (order_id, link, quantity, active)
        VALUES (?, ?, ?, 1)
        RETURNING id, order_id, link, quantity, active
        "#,
    )
    .bind(order_id)
    .bind(link)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("Added item {} to order {} for {}", item.id, order_id, owner_id);
    Ok(item)
}

/// Set one text field on the user's order and apply the accompanying
/// session update.
///
/// Fails with `NotFound` (and writes nothing) if the user has no order.
pub async fn set_order_field(
    pool: &SqlitePool,
    owner_id: &str,
    field: OrderField,
    value: &str,
    update: &SessionUpdate,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    session::apply_update(&mut *tx, update).await?;

    // Column names can't be bound; they come from the OrderField enum.
    let query = format!(
        r#"
        UPDATE orders
        SET {column} = ?, updated_at = ?
        WHERE owner_id = ?
        "#,
        column = field.column_name()
    );

    let result = sqlx::query(&query)
        .bind(value)
        .bind(update.at)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Order",
            id: owner_id.to_string(),
        });
    }

    tx.commit().await?;
    Ok(())
}

/// Get the user's order, if one is in progress.
pub async fn get_order<'e, E: SqliteExecutor<'e>>(
    executor: E,
    owner_id: &str,
) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, owner_id, email, phone, address, note, order_code, created_at, updated_at
        FROM orders
        WHERE owner_id = ?
        "#,
    )
    .bind(owner_id)
    .fetch_optional(executor)
    .await?;

    Ok(order)
}

/// Get the active items of an order, oldest first.
pub async fn list_items<'e, E: SqliteExecutor<'e>>(
    executor: E,
    order_id: i64,
) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, link, quantity, active
        FROM order_items
        WHERE order_id = ? AND active = 1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Get the user's order together with its items.
pub async fn get_order_with_items(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Option<OrderWithItems>> {
    let mut conn = pool.acquire().await?;

    let Some(order) = get_order(&mut *conn, owner_id).await? else {
        return Ok(None);
    };
    let items = list_items(&mut *conn, order.id).await?;

    Ok(Some(OrderWithItems { order, items }))
}

/// Record the phone number and order code on an order about to be submitted.
pub async fn stage_submission<'e, E: SqliteExecutor<'e>>(
    executor: E,
    order_id: i64,
    phone: &str,
    order_code: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET phone = ?, order_code = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(phone)
    .bind(order_code)
    .bind(at)
    .bind(order_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        });
    }

    Ok(())
}

/// Delete a submitted order and its items, and apply the accompanying
/// session update.
pub async fn commit_submission(
    pool: &SqlitePool,
    order_id: i64,
    update: &SessionUpdate,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    session::apply_update(&mut *tx, update).await?;

    sqlx::query(
        r#"
        DELETE FROM order_items
        WHERE order_id = ?
        "#,
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        r#"
        DELETE FROM orders
        WHERE id = ?
        "#,
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        });
    }

    tx.commit().await?;
    Ok(())
}

/// Count orders owned by a user (0 or 1).
pub async fn count_orders<'e, E: SqliteExecutor<'e>>(executor: E, owner_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM orders WHERE owner_id = ?
        "#,
    )
    .bind(owner_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Count all order items, across every order.
pub async fn count_items<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM order_items
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}
