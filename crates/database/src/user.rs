//! User operations.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Create a user on first contact, or refresh the display name.
///
/// A `None` name never overwrites a stored one.
pub async fn upsert_user<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: &str,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, created_at, updated_at)
        VALUES (?1, COALESCE(?2, ''), ?3, ?3)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            updated_at = excluded.updated_at
        WHERE ?2 IS NOT NULL AND users.name <> excluded.name
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a user by ID.
pub async fn get_user<'e, E: SqliteExecutor<'e>>(executor: E, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Count total users.
pub async fn count_users<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}
