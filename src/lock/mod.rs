//! Per-room mutual exclusion.
//!
//! Every room mutation runs inside [`with_lock`](dyn LockManager::with_lock)
//! keyed by the room id. [`StoreLockManager`] coordinates across hub
//! instances through leases in the shared store; [`LocalLockManager`]
//! serializes tasks inside one process.

use crate::store::StoreError;
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

pub mod local;
pub mod store;

pub use local::LocalLockManager;
pub use store::{LockSettings, StoreLockManager};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to acquire lock '{key}' after {attempts} attempts")]
    AcquisitionFailed { key: String, attempts: u32 },

    #[error("lock acquisition for '{0}' was cancelled")]
    Cancelled(String),

    #[error("lock store error: {0}")]
    Store(#[from] StoreError),
}

impl LockError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AcquisitionFailed { .. } => "lock_acquisition_failed",
            Self::Cancelled(_) => "lock_cancelled",
            Self::Store(e) => e.error_code(),
        }
    }
}

/// Proof of holding a lock. Hand it back to the manager that issued it.
///
/// A lease that is dropped without being released frees a local lock
/// immediately; a store lease lapses when its timeout expires.
#[derive(Debug)]
pub struct Lease {
    key: String,
    holder: Holder,
}

#[derive(Debug)]
enum Holder {
    Token(String),
    Local(OwnedMutexGuard<()>),
}

impl Lease {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
pub trait LockManager: Send + Sync {
    /// Block until the lock for `key` is held, the retry budget is spent,
    /// or `cancel` fires.
    async fn acquire(&self, cancel: &CancellationToken, key: &str) -> Result<Lease, LockError>;

    /// Give a lease back. Failures are logged, never surfaced: the lease
    /// expires on its own.
    async fn release(&self, lease: Lease);
}

impl dyn LockManager {
    /// Run `f` while holding the lock for `key`. The lock is released
    /// whether `f` succeeds or fails.
    pub async fn with_lock<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        key: &str,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let lease = self.acquire(cancel, key).await?;
        let outcome = f().await;
        self.release(lease).await;
        outcome
    }

    /// [`with_lock`](Self::with_lock) for work that yields no value.
    pub async fn execute_with_lock<E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        key: &str,
        f: F,
    ) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<LockError>,
    {
        self.with_lock(cancel, key, f).await
    }
}
