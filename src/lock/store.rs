//! Lease locks held in the shared store.
//!
//! A lease is a `SET NX` of a random token under `planning-poker:lock:<key>`
//! with the lease timeout as expiry. Release deletes the key only if it
//! still holds our token, so a lease that lapsed and was taken by another
//! instance is never stolen back.

use super::{Holder, Lease, LockError, LockManager};
use crate::store::{SharedStore, keys};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LockSettings {
    /// How long a lease lives if its holder never releases it.
    pub lease_timeout: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(50),
            max_retries: 100,
        }
    }
}

pub struct StoreLockManager {
    store: Arc<dyn SharedStore>,
    settings: LockSettings,
}

impl StoreLockManager {
    pub fn new(store: Arc<dyn SharedStore>, settings: LockSettings) -> Self {
        Self { store, settings }
    }
}

#[async_trait]
impl LockManager for StoreLockManager {
    async fn acquire(&self, cancel: &CancellationToken, key: &str) -> Result<Lease, LockError> {
        let lock_key = keys::lock(key);
        let token = Uuid::new_v4().to_string();
        let attempts = self.settings.max_retries.max(1);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled(key.to_string()));
            }

            if self
                .store
                .set_if_absent(&lock_key, &token, self.settings.lease_timeout)
                .await?
            {
                debug!(key = %key, attempt, "Lock acquired");
                return Ok(Lease {
                    key: key.to_string(),
                    holder: Holder::Token(token),
                });
            }

            if attempt < attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LockError::Cancelled(key.to_string())),
                    _ = tokio::time::sleep(self.settings.retry_delay) => {}
                }
            }
        }

        warn!(key = %key, attempts, "Lock acquisition exhausted retries");
        Err(LockError::AcquisitionFailed {
            key: key.to_string(),
            attempts,
        })
    }

    async fn release(&self, lease: Lease) {
        let Holder::Token(token) = lease.holder else {
            error!(key = %lease.key, "Lease was not issued by the store lock manager");
            return;
        };
        match self
            .store
            .delete_if_equals(&keys::lock(&lease.key), &token)
            .await
        {
            Ok(true) => debug!(key = %lease.key, "Lock released"),
            Ok(false) => warn!(key = %lease.key, "Lease had already expired"),
            Err(e) => error!(key = %lease.key, error = %e, "Failed to release lock"),
        }
    }
}
