//! Hub backed by a [`SharedStore`].
//!
//! Updates travel as envelopes on `planning-poker:updates:<room>`:
//!
//! ```json
//! {"roomId":"…","payload":{"type":"room-state", …}}
//! ```
//!
//! Each instance subscribes to a room's channel while it has at least one
//! local client in that room, and a forwarding task relays every envelope
//! to those clients' buses.

use super::registry::LocalRegistry;
use super::{Bus, Departure, Hub, HubError};
use crate::metrics;
use crate::state::{Client, Room, decode_room, encode_room};
use crate::store::{SharedStore, Subscription, keys};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    room_id: String,
    payload: serde_json::Value,
}

pub struct StoreHub {
    store: Arc<dyn SharedStore>,
    room_ttl: Duration,
    registry: Arc<Mutex<LocalRegistry>>,
    span: Span,
}

impl StoreHub {
    /// `span` parents the spans of every forwarding task this hub starts.
    pub fn new(store: Arc<dyn SharedStore>, room_ttl: Duration, span: Span) -> Self {
        Self {
            store,
            room_ttl,
            registry: Arc::new(Mutex::new(LocalRegistry::default())),
            span,
        }
    }

    fn forwarder_span(&self, room_id: &str) -> Span {
        info_span!(parent: &self.span, "room_updates", room_id = %room_id)
    }
}

#[async_trait]
impl Hub for StoreHub {
    async fn new_room(&self, created_by: &str) -> Result<Room, HubError> {
        let room = Room::new(created_by);
        self.save_room(&room).await?;
        info!(room_id = %room.id(), created_by = %created_by, "Room created");
        Ok(room)
    }

    async fn get_room(&self, room_id: &str) -> Option<Room> {
        let data = match self.store.get(&keys::room(room_id)).await {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                error!(room_id = %room_id, error = %e, "Failed to load room");
                return None;
            }
        };
        match decode_room(&data) {
            Ok(room) => Some(room),
            Err(e) => {
                error!(room_id = %room_id, error = %e, "Stored room is corrupt");
                None
            }
        }
    }

    async fn save_room(&self, room: &Room) -> Result<(), HubError> {
        let data = encode_room(room)?;
        self.store
            .set(&keys::room(room.id()), &data, self.room_ttl)
            .await?;
        Ok(())
    }

    async fn remove_room(&self, room_id: &str) {
        if let Err(e) = self.store.delete(&keys::room(room_id)).await {
            error!(room_id = %room_id, error = %e, "Failed to delete room");
        }
    }

    async fn find_client_by_id(&self, client_id: &str) -> Option<(String, Client)> {
        let room_id = match self.store.get(&keys::client(client_id)).await {
            Ok(Some(room_id)) => room_id,
            Ok(None) => return None,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "Failed to resolve client");
                return None;
            }
        };
        let room = self.get_room(&room_id).await?;
        let client = room.clients().get(client_id)?.clone();
        Some((room_id, client))
    }

    async fn add_client(&self, room: &Room, client_id: &str) -> Result<(), HubError> {
        self.store
            .set(&keys::client(client_id), room.id(), self.room_ttl)
            .await?;
        self.save_room(room).await
    }

    async fn remove_client(&self, room_id: &str, client_id: &str) -> Result<Departure, HubError> {
        if let Err(e) = self.store.delete(&keys::client(client_id)).await {
            warn!(client_id = %client_id, error = %e, "Failed to delete client mapping");
        }
        self.remove_bus(client_id).await;

        let mut room = self
            .get_room(room_id)
            .await
            .ok_or_else(|| HubError::RoomNotFound(room_id.to_string()))?;
        room.remove_client(client_id)?;

        if room.is_empty() {
            self.remove_room(room_id).await;
            info!(room_id = %room_id, "Last participant left, room closed");
            return Ok(Departure::RoomClosed);
        }
        self.save_room(&room).await?;
        Ok(Departure::Remaining(room))
    }

    async fn add_bus(&self, bus: Arc<dyn Bus>) -> Result<(), HubError> {
        let mut registry = self.registry.lock().await;

        // A client id registers at most one bus.
        if let Some(stale) = registry.detach(bus.client_id()) {
            stale.cancel.cancel();
        }
        if registry.join(&bus) {
            return Ok(());
        }

        let room_id = bus.room_id().to_string();
        let channel = keys::updates(&room_id);
        let updates = self.store.subscribe(&channel).await?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            forward_updates(
                room_id.clone(),
                channel,
                updates,
                Arc::clone(&self.store),
                Arc::clone(&self.registry),
                cancel.clone(),
            )
            .instrument(self.forwarder_span(&room_id)),
        );
        registry.start(&bus, cancel, task);
        info!(room_id = %room_id, "Subscribed to room updates");
        Ok(())
    }

    async fn get_bus(&self, client_id: &str) -> Option<Arc<dyn Bus>> {
        self.registry.lock().await.bus(client_id)
    }

    async fn remove_bus(&self, client_id: &str) {
        let stopped = self.registry.lock().await.detach(client_id);
        if let Some(sub) = stopped {
            // The task takes the registry lock to deliver, so it is not
            // awaited here.
            sub.cancel.cancel();
            info!(client_id = %client_id, "Last local client left, unsubscribed from room updates");
        }
    }

    async fn broadcast_to_room(
        &self,
        room_id: &str,
        payload: serde_json::Value,
    ) -> Result<(), HubError> {
        let envelope = Envelope {
            room_id: room_id.to_string(),
            payload,
        };
        let data = serde_json::to_string(&envelope)?;
        self.store.publish(&keys::updates(room_id), &data).await?;
        Ok(())
    }

    async fn get_rooms(&self) -> Vec<Room> {
        let room_keys = match self.store.scan_prefix(keys::ROOM_PREFIX).await {
            Ok(room_keys) => room_keys,
            Err(e) => {
                error!(error = %e, "Failed to list rooms");
                return Vec::new();
            }
        };
        let mut rooms = Vec::with_capacity(room_keys.len());
        for key in &room_keys {
            let Some(room_id) = keys::room_id(key) else {
                continue;
            };
            if let Some(room) = self.get_room(room_id).await {
                rooms.push(room);
            }
        }
        rooms.sort_by(|a, b| a.id().cmp(b.id()));
        rooms
    }

    async fn local_client_count(&self, room_id: &str) -> usize {
        self.registry.lock().await.local_count(room_id)
    }

    async fn shutdown(&self) {
        let subs = self.registry.lock().await.drain();
        let count = subs.len();
        for sub in &subs {
            sub.cancel.cancel();
        }
        for sub in subs {
            if let Err(e) = sub.task.await {
                error!(error = %e, "Forwarding task failed");
            }
        }
        info!(subscriptions = count, "Hub shut down");
    }
}

/// Relay envelopes from a room channel to the room's local buses until
/// cancelled. A lost subscription is re-established.
async fn forward_updates(
    room_id: String,
    channel: String,
    mut updates: Subscription,
    store: Arc<dyn SharedStore>,
    registry: Arc<Mutex<LocalRegistry>>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = updates.next() => next,
        };

        let Some(payload) = payload else {
            warn!("Update subscription lost, resubscribing");
            match resubscribe(&store, &channel, &cancel).await {
                Some(fresh) => {
                    updates = fresh;
                    continue;
                }
                None => break,
            }
        };

        let envelope: Envelope = match serde_json::from_str(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping malformed update");
                continue;
            }
        };
        if envelope.room_id != room_id {
            warn!(envelope_room = %envelope.room_id, "Dropping update addressed to another room");
            continue;
        }

        let text = envelope.payload.to_string();
        let buses = registry.lock().await.room_buses(&room_id);
        let results = join_all(buses.iter().map(|bus| bus.send(&text))).await;
        for (bus, result) in buses.iter().zip(results) {
            if let Err(e) = result {
                metrics::record_broadcast_dropped();
                warn!(client_id = %bus.client_id(), error = %e, "Failed to deliver update");
            }
        }
    }
    debug!("Forwarding stopped");
}

async fn resubscribe(
    store: &Arc<dyn SharedStore>,
    channel: &str,
    cancel: &CancellationToken,
) -> Option<Subscription> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
        }
        match store.subscribe(channel).await {
            Ok(updates) => {
                info!("Resubscribed to room updates");
                return Some(updates);
            }
            Err(e) => warn!(error = %e, "Resubscribe failed"),
        }
    }
}
