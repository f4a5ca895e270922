//! In-process lock manager: one async mutex per key.

use super::{Holder, Lease, LockError, LockManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

#[derive(Default)]
pub struct LocalLockManager {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LocalLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a live mutex.
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(&self, cancel: &CancellationToken, key: &str) -> Result<Lease, LockError> {
        let mutex = Arc::clone(
            self.locks
                .lock()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        );

        tokio::select! {
            guard = mutex.lock_owned() => {
                debug!(key = %key, "Lock acquired");
                Ok(Lease { key: key.to_string(), holder: Holder::Local(guard) })
            }
            _ = cancel.cancelled() => Err(LockError::Cancelled(key.to_string())),
        }
    }

    async fn release(&self, lease: Lease) {
        let Lease { key, holder } = lease;
        match holder {
            Holder::Local(guard) => drop(guard),
            Holder::Token(_) => {
                error!(key = %key, "Lease was not issued by the local lock manager");
                return;
            }
        }

        // Forget the mutex once nobody holds or awaits it.
        let mut locks = self.locks.lock();
        if locks.get(&key).is_some_and(|m| Arc::strong_count(m) == 1) {
            locks.remove(&key);
        }
        debug!(key = %key, "Lock released");
    }
}
