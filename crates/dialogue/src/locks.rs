//! Per-sender serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Keyed async mutex: one holder per sender at a time.
///
/// Entries exist only while a sender is being processed or waited on.
#[derive(Debug, Clone, Default)]
pub struct SenderLocks {
    map: Arc<Mutex<LockMap>>,
}

impl SenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other event from `sender_id` is being processed.
    pub async fn lock(&self, sender_id: &str) -> SenderGuard {
        let entry = {
            let mut map = lock_map(&self.map);
            map.entry(sender_id.to_string()).or_default().clone()
        };

        let guard = entry.lock_owned().await;

        SenderGuard {
            map: Arc::clone(&self.map),
            sender_id: sender_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of senders currently holding or waiting for a lock.
    pub fn len(&self) -> usize {
        lock_map(&self.map).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held while an event for one sender is processed.
#[derive(Debug)]
pub struct SenderGuard {
    map: Arc<Mutex<LockMap>>,
    sender_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SenderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = lock_map(&self.map);
        let idle = map
            .get(&self.sender_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1);
        if idle {
            map.remove(&self.sender_id);
        }
    }
}

fn lock_map(map: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
