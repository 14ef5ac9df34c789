//! Periodic session reaper.

use std::time::Duration;

use dialogue::{ConversationStore, SessionReaper};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Run the reaper every `interval` in a background task.
///
/// The first sweep happens one interval after start. Failures are logged
/// and the next sweep runs on schedule.
pub fn spawn_reaper<S>(reaper: SessionReaper<S>, interval: Duration) -> JoinHandle<()>
where
    S: ConversationStore + 'static,
{
    info!(
        "Session reaper running every {:?} (idle limit {})",
        interval,
        reaper.max_idle()
    );

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match reaper.sweep().await {
                Ok(0) => debug!("Reaper sweep found no stale sessions"),
                Ok(count) => info!("Reaper deactivated {} sessions", count),
                Err(e) => error!("Reaper sweep failed: {}", e),
            }
        }
    })
}
