//! Stale session sweep.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::ConversationStore;

/// Deactivates sessions nobody has touched for a while.
///
/// A user whose session was deactivated simply starts over at the menu
/// with the next event.
#[derive(Debug, Clone)]
pub struct SessionReaper<S> {
    store: S,
    max_idle: Duration,
}

impl<S: ConversationStore> SessionReaper<S> {
    /// Create a reaper with a 24 hour idle limit.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_idle: Duration::hours(24),
        }
    }

    /// Set the idle limit.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Run one sweep now. Returns how many sessions were deactivated.
    pub async fn sweep(&self) -> Result<u64> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as of `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = now - self.max_idle;
        let count = self.store.deactivate_stale_sessions(cutoff).await?;

        if count > 0 {
            info!("Deactivated {} sessions idle since before {}", count, cutoff);
        } else {
            debug!("No stale sessions before {}", cutoff);
        }

        Ok(count)
    }
}
