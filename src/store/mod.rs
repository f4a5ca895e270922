//! Shared store abstraction.
//!
//! Every hub instance reads and writes rooms, client mappings and locks
//! through a [`SharedStore`], and exchanges room updates over its pub/sub
//! channels. `memory` serves single-instance deployments and tests;
//! `redis` lets several instances share one deployment.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

pub mod keys;
pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected reply: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::Protocol(_) => "store_protocol",
        }
    }
}

/// Messages received on a subscribed channel. The stream ends when the
/// subscription is lost.
pub type Subscription = BoxStream<'static, String>;

#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Write only if no live value exists. Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete only if the live value equals `expected`, atomically.
    /// Returns whether a value was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// All live keys starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;

    /// Subscribe to a channel. The subscription is active once this returns.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and health reports.
    fn backend(&self) -> &'static str;
}
