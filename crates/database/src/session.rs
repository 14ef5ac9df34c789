//! Conversation session storage.
//!
//! A user has at most one active session; the partial unique index on
//! `sessions(user_id) WHERE active = 1` enforces it even when two first
//! contacts race.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::Session;

/// The fields written when a session moves (or stays) after an event.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    /// Session to update.
    pub session_id: i64,
    /// New stored state.
    pub state: String,
    /// New pending link.
    pub pending_link: Option<String>,
    /// New pending quantity.
    pub pending_quantity: Option<f64>,
    /// Activity timestamp.
    pub at: DateTime<Utc>,
}

impl SessionUpdate {
    /// Move a session to `state`, clearing the scratch fields.
    pub fn new(session_id: i64, state: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            state: state.into(),
            pending_link: None,
            pending_quantity: None,
            at,
        }
    }

    /// Keep a link in the scratch field.
    pub fn with_pending_link(mut self, link: impl Into<String>) -> Self {
        self.pending_link = Some(link.into());
        self
    }

    /// Record activity on a session without changing anything else.
    pub fn keep(session: &Session, at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id,
            state: session.state.clone(),
            pending_link: session.pending_link.clone(),
            pending_quantity: session.pending_quantity,
            at,
        }
    }
}

/// Get the active session for a user.
pub async fn get_active_session<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        r#"
        SELECT id, user_id, state, pending_link, pending_quantity, active, last_activity
        FROM sessions
        WHERE user_id = ? AND active = 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(session)
}

/// Get a session by ID, active or not.
pub async fn get_session<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Session> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, user_id, state, pending_link, pending_quantity, active, last_activity
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Session",
        id: id.to_string(),
    })
}

/// Open a session for a user in `state`.
///
/// If the user already has an active session (for example because a
/// concurrent event created it first), that session is returned unchanged.
/// When a new session is created, any order left behind by an earlier
/// session (one that was reaped mid-purchase) is deleted in the same
/// transaction, so a new conversation always starts a new order.
/// The user row must already exist.
pub async fn open_session(
    pool: &SqlitePool,
    user_id: &str,
    state: &str,
    now: DateTime<Utc>,
) -> Result<Session> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO sessions (user_id, state, active, last_activity)
        VALUES (?, ?, 1, ?)
        "#,
    )
    .bind(user_id)
    .bind(state)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Active session already exists for {}", user_id);
    } else {
        let dropped = discard_leftover_order(&mut tx, user_id).await?;
        if dropped > 0 {
            tracing::info!("Discarded abandoned order for {}", user_id);
        }
    }

    let session = get_active_session(&mut *tx, user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Session",
            id: user_id.to_string(),
        })?;

    tx.commit().await?;
    Ok(session)
}

/// Delete a user's order and its items. Returns the number of orders deleted.
async fn discard_leftover_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
) -> Result<u64> {
    sqlx::query(
        r#"
        DELETE FROM order_items
        WHERE order_id IN (SELECT id FROM orders WHERE owner_id = ?)
        "#,
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    let result = sqlx::query(
        r#"
        DELETE FROM orders
        WHERE owner_id = ?
        "#,
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Write a session update.
pub async fn apply_update<'e, E: SqliteExecutor<'e>>(
    executor: E,
    update: &SessionUpdate,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET state = ?, pending_link = ?, pending_quantity = ?, last_activity = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.state)
    .bind(&update.pending_link)
    .bind(update.pending_quantity)
    .bind(update.at)
    .bind(update.session_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Session",
            id: update.session_id.to_string(),
        });
    }

    Ok(())
}

/// Deactivate a single session.
///
/// Returns true if the session was active.
pub async fn deactivate_session<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET active = 0
        WHERE id = ? AND active = 1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deactivate every active session whose last activity is before `cutoff`.
///
/// Only ever flips `active` from true to false and never deletes rows, so
/// running it twice, or concurrently with normal traffic, is harmless.
/// Returns the number of sessions deactivated.
pub async fn deactivate_stale_sessions<'e, E: SqliteExecutor<'e>>(
    executor: E,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET active = 0
        WHERE active = 1 AND julianday(last_activity) < julianday(?)
        "#,
    )
    .bind(cutoff)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Count active sessions for a user (0 or 1).
pub async fn count_active_sessions<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM sessions
        WHERE user_id = ? AND active = 1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use crate::{user, Database};
    use chrono::Duration;

    async fn db_with_user(id: &str) -> Database {
        let db = test_db().await;
        user::upsert_user(db.pool(), id, None, Utc::now()).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_open_session_is_idempotent() {
        let db = db_with_user("100").await;
        let now = Utc::now();

        let first = open_session(db.pool(), "100", "greeting", now).await.unwrap();
        let second = open_session(db.pool(), "100", "get_link", now).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.state, "greeting");
        assert_eq!(count_active_sessions(db.pool(), "100").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_session_requires_user() {
        let db = test_db().await;
        let result = open_session(db.pool(), "ghost", "greeting", Utc::now()).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_apply_update() {
        let db = db_with_user("100").await;
        let now = Utc::now();
        let session = open_session(db.pool(), "100", "greeting", now).await.unwrap();

        let update = SessionUpdate::new(session.id, "get_link", now + Duration::seconds(5))
            .with_pending_link("https://example.com/a");
        apply_update(db.pool(), &update).await.unwrap();

        let fetched = get_session(db.pool(), session.id).await.unwrap();
        assert_eq!(fetched.state, "get_link");
        assert_eq!(fetched.pending_link.as_deref(), Some("https://example.com/a"));
        assert!(fetched.last_activity > session.last_activity);

        let cleared = SessionUpdate::new(session.id, "get_quantity", now);
        apply_update(db.pool(), &cleared).await.unwrap();
        let fetched = get_session(db.pool(), session.id).await.unwrap();
        assert!(fetched.pending_link.is_none());
        assert!(fetched.pending_quantity.is_none());
    }

    #[tokio::test]
    async fn test_apply_update_missing_session() {
        let db = test_db().await;
        let update = SessionUpdate::new(999, "greeting", Utc::now());
        let result = apply_update(db.pool(), &update).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { entity: "Session", .. })));
    }

    #[tokio::test]
    async fn test_deactivated_user_gets_fresh_session() {
        let db = db_with_user("100").await;
        let now = Utc::now();
        let first = open_session(db.pool(), "100", "get_email", now).await.unwrap();

        assert!(deactivate_session(db.pool(), first.id).await.unwrap());
        assert!(!deactivate_session(db.pool(), first.id).await.unwrap());
        assert!(get_active_session(db.pool(), "100").await.unwrap().is_none());

        let second = open_session(db.pool(), "100", "greeting", now).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.state, "greeting");
        assert_eq!(count_active_sessions(db.pool(), "100").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_new_session_discards_leftover_order() {
        let db = db_with_user("100").await;
        let now = Utc::now();
        let first = open_session(db.pool(), "100", "get_link", now).await.unwrap();
        let update = SessionUpdate::new(first.id, "get_quantity", now);
        crate::order::append_item(db.pool(), "100", "https://example.com/a", 5.0, &update)
            .await
            .unwrap();

        // Reopening while the session is still active keeps the order
        open_session(db.pool(), "100", "greeting", now).await.unwrap();
        assert_eq!(crate::order::count_orders(db.pool(), "100").await.unwrap(), 1);

        deactivate_session(db.pool(), first.id).await.unwrap();
        open_session(db.pool(), "100", "greeting", now).await.unwrap();
        assert_eq!(crate::order::count_orders(db.pool(), "100").await.unwrap(), 0);
        assert_eq!(crate::order::count_items(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_stale_sessions() {
        let db = test_db().await;
        let now = Utc::now();
        for id in ["stale", "fresh"] {
            user::upsert_user(db.pool(), id, None, now).await.unwrap();
        }

        let stale = open_session(db.pool(), "stale", "get_note", now - Duration::hours(25))
            .await
            .unwrap();
        let fresh = open_session(db.pool(), "fresh", "greeting", now - Duration::hours(23))
            .await
            .unwrap();

        let cutoff = now - Duration::hours(24);
        assert_eq!(deactivate_stale_sessions(db.pool(), cutoff).await.unwrap(), 1);
        // Running again changes nothing
        assert_eq!(deactivate_stale_sessions(db.pool(), cutoff).await.unwrap(), 0);

        assert!(!get_session(db.pool(), stale.id).await.unwrap().active);
        assert!(get_session(db.pool(), fresh.id).await.unwrap().active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_contact_single_active_session() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("sessions.db").display());
        let db = Database::connect(&url).await.unwrap();
        db.migrate().await.unwrap();

        for round in 0..5 {
            let user_id = format!("user-{}", round);
            user::upsert_user(db.pool(), &user_id, None, Utc::now()).await.unwrap();

            let mut handles = Vec::new();
            for _ in 0..16 {
                let pool = db.pool().clone();
                let user_id = user_id.clone();
                handles.push(tokio::spawn(async move {
                    open_session(&pool, &user_id, "greeting", Utc::now()).await
                }));
            }

            let mut ids = Vec::new();
            for handle in handles {
                ids.push(handle.await.unwrap().unwrap().id);
            }
            ids.dedup();
            assert_eq!(ids.len(), 1, "all callers see the same session");
            assert_eq!(count_active_sessions(db.pool(), &user_id).await.unwrap(), 1);
        }
    }
}
