use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::GameError;
use crate::model::MatchId;

/// One async mutex per match id. Operations on the same match serialize;
/// different matches never contend.
pub struct MatchLocks {
    locks: DashMap<MatchId, Arc<Mutex<()>>>,
    timeout: Duration,
}

pub type MatchGuard = OwnedMutexGuard<()>;

impl MatchLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Wait for exclusive access to `id`. Waiting longer than the configured
    /// timeout yields `Unavailable`.
    pub async fn acquire(&self, id: MatchId) -> Result<MatchGuard, GameError> {
        let lock = self.locks.entry(id).or_default().clone();
        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(match_id = %id, "Timed out waiting for match lock");
                GameError::Unavailable
            })
    }

    /// Drop the lock entry for a match nobody is holding or waiting on.
    pub fn forget(&self, id: MatchId) {
        self.locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
