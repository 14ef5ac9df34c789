//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use database::sqlite_url_from_path;
use order_gateway::{GatewayConfig, GatewayError};

/// Intake bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event ingestion bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Bound on waiting for a pooled connection.
    pub acquire_timeout: Duration,
    /// Order service settings.
    pub gateway: GatewayConfig,
    /// Processing budget for one event.
    pub event_timeout: Duration,
    /// Where replies are POSTed. Replies are only logged when unset.
    pub reply_webhook_url: Option<String>,
    /// Sessions idle longer than this are deactivated.
    pub session_max_idle: chrono::Duration,
    /// How often the session reaper runs.
    pub reaper_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `INTAKE_ADDR` | Event ingestion bind address | `127.0.0.1:8080` |
    /// | `SQLITE_PATH` | SQLite path or `sqlite:` URL | `./data/intake.db` |
    /// | `SQLITE_POOL_SIZE` | Connection pool size | `20` |
    /// | `SQLITE_ACQUIRE_TIMEOUT_SECS` | Wait for a pooled connection | `30` |
    /// | `INTAKE_EVENT_TIMEOUT_SECS` | Processing budget per event | `30` |
    /// | `INTAKE_REPLY_WEBHOOK_URL` | Reply webhook | (unset) |
    /// | `SESSION_MAX_IDLE_HOURS` | Reaper idle threshold | `24` |
    /// | `REAPER_INTERVAL_SECS` | Reaper period | `86400` |
    ///
    /// Order service variables are read by [`GatewayConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("INTAKE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = sqlite_url_from_path(
            &env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/intake.db".to_string()),
        );

        let pool_size = env::var("SQLITE_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(database::Database::DEFAULT_POOL_SIZE);

        let acquire_timeout = env::var("SQLITE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(database::Database::DEFAULT_ACQUIRE_TIMEOUT);

        let gateway = GatewayConfig::from_env()?;

        let event_timeout = env::var("INTAKE_EVENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let reply_webhook_url = env::var("INTAKE_REPLY_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let session_max_idle = env::var("SESSION_MAX_IDLE_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(chrono::Duration::hours)
            .unwrap_or_else(|| chrono::Duration::hours(24));

        let reaper_interval = env::var("REAPER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(24 * 60 * 60));

        Ok(Self {
            addr,
            database_url,
            pool_size,
            acquire_timeout,
            gateway,
            event_timeout,
            reply_webhook_url,
            session_max_idle,
            reaper_interval,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid INTAKE_ADDR format")]
    InvalidAddr,

    #[error("Invalid order service configuration: {0}")]
    Gateway(#[from] GatewayError),
}
