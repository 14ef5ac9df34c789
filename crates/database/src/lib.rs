//! SQLite persistence layer for the order intake bot.
//!
//! This crate provides async database operations for users, conversation
//! sessions, and in-progress orders using SQLx with SQLite. Operations that
//! touch more than one row (adding an item, filling an order field, committing
//! a submitted order) run in a single transaction together with the session
//! update that accompanies them.
//!
//! # Example
//!
//! ```no_run
//! use database::{session, user, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:intake.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // First contact from a user
//!     let now = chrono::Utc::now();
//!     user::upsert_user(db.pool(), "1234567890", Some("Lan"), now).await?;
//!     let session = session::open_session(db.pool(), "1234567890", "greeting", now).await?;
//!     println!("session {} in {}", session.id, session.state);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;
pub mod order;
pub mod session;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{Order, OrderItem, OrderWithItems, Session, User};
pub use order::OrderField;
pub use session::SessionUpdate;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Default bound on waiting for a pooled connection.
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/intake.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, Self::DEFAULT_POOL_SIZE, Self::DEFAULT_ACQUIRE_TIMEOUT).await
    }

    /// Connect to a SQLite database with a custom pool size and acquire timeout.
    pub async fn connect_with(url: &str, pool_size: u32, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(acquire_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Build a SQLite URL from a path, passing `sqlite:` URLs through unchanged.
pub fn sqlite_url_from_path(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", path)
    }
}
