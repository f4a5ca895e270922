//! In-process shared store.
//!
//! Keys expire lazily: an expired entry is treated as absent by every read
//! and replaced or dropped on the next write that touches it. Every
//! `SWEEP_INTERVAL` writes, and on every scan, expired entries are purged.
//! Pub/sub runs on one broadcast channel per topic, dropped with its last
//! subscriber.

use super::{SharedStore, StoreError, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 256;

/// Writes between two purges of expired entries.
const SWEEP_INTERVAL: u64 = 1024;

type Channels = DashMap<String, broadcast::Sender<String>>;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    channels: Arc<Channels>,
    channel_capacity: usize,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_channel_capacity(CHANNEL_CAPACITY)
    }

    /// Subscribers that fall more than `capacity` messages behind skip ahead.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            channels: Arc::new(DashMap::new()),
            channel_capacity: capacity.max(1),
            writes: AtomicU64::new(0),
        }
    }

    /// Count a write and purge expired entries every `SWEEP_INTERVAL` writes.
    fn note_write(&self) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.purge_expired(Instant::now());
        }
    }

    fn purge_expired(&self, now: Instant) {
        self.entries.retain(|_, e| e.is_live(now));
    }

    /// Topics with at least one live subscription.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A subscriber's end of a topic. Dropping the last one removes the topic.
struct Listener {
    rx: broadcast::Receiver<String>,
    channel: String,
    channels: Arc<Channels>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        // `rx` is still alive here, so a count of one means only us.
        self.channels.remove_if(&self.channel, |_, tx| tx.receiver_count() <= 1);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .map(|e| e.is_live(now).then(|| e.value.clone()));
        match live {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(key, |_, e| !e.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), Entry::new(value, ttl));
        self.note_write();
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.note_write();
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Ok(false);
                }
                occupied.insert(Entry::new(value, ttl));
                Ok(true)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, e| e.is_live(now) && e.value == expected);
        Ok(removed.is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        self.purge_expired(now);
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.value().is_live(now))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let sender = self.channels.get(channel).map(|s| s.value().clone());
        if let Some(sender) = sender {
            // No receivers is not an error: nobody is listening right now.
            let _ = sender.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        // Subscribing under the entry guard keeps the receiver count exact
        // for a concurrent `Listener::drop`.
        let rx = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe();
        let listener = Listener {
            rx,
            channel: channel.to_string(),
            channels: Arc::clone(&self.channels),
        };
        let stream = futures_util::stream::unfold(listener, |mut listener| async move {
            loop {
                match listener.rx.recv().await {
                    Ok(payload) => return Some((payload, listener)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            channel = %listener.channel,
                            skipped,
                            "Subscriber lagged, skipping messages"
                        );
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
