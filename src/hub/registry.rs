//! Buses connected to this instance and the room subscriptions they hold.

use super::Bus;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One room's update subscription, shared by that room's local clients.
pub(super) struct RoomSubscription {
    clients: HashSet<String>,
    pub(super) cancel: CancellationToken,
    pub(super) task: JoinHandle<()>,
}

#[derive(Default)]
pub(super) struct LocalRegistry {
    buses: HashMap<String, Arc<dyn Bus>>,
    rooms: HashMap<String, RoomSubscription>,
}

impl LocalRegistry {
    pub(super) fn bus(&self, client_id: &str) -> Option<Arc<dyn Bus>> {
        self.buses.get(client_id).cloned()
    }

    /// Attach a client to an already running room subscription. Returns
    /// `false` if the room has no subscription on this instance yet.
    pub(super) fn join(&mut self, bus: &Arc<dyn Bus>) -> bool {
        let Some(sub) = self.rooms.get_mut(bus.room_id()) else {
            return false;
        };
        sub.clients.insert(bus.client_id().to_string());
        self.buses
            .insert(bus.client_id().to_string(), Arc::clone(bus));
        true
    }

    /// Record a freshly started room subscription with its first client.
    pub(super) fn start(
        &mut self,
        bus: &Arc<dyn Bus>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) {
        let mut clients = HashSet::new();
        clients.insert(bus.client_id().to_string());
        self.rooms.insert(
            bus.room_id().to_string(),
            RoomSubscription {
                clients,
                cancel,
                task,
            },
        );
        self.buses
            .insert(bus.client_id().to_string(), Arc::clone(bus));
    }

    /// Drop a client's bus. If it was the room's last local client, the
    /// room subscription is handed back for the caller to stop.
    pub(super) fn detach(&mut self, client_id: &str) -> Option<RoomSubscription> {
        let bus = self.buses.remove(client_id)?;
        let room_id = bus.room_id();
        let sub = self.rooms.get_mut(room_id)?;
        sub.clients.remove(client_id);
        if sub.clients.is_empty() {
            return self.rooms.remove(room_id);
        }
        None
    }

    pub(super) fn room_buses(&self, room_id: &str) -> Vec<Arc<dyn Bus>> {
        self.rooms
            .get(room_id)
            .map(|sub| {
                sub.clients
                    .iter()
                    .filter_map(|id| self.buses.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(super) fn local_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |sub| sub.clients.len())
    }

    #[cfg(test)]
    pub(super) fn is_subscribed(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Remove every subscription and bus.
    pub(super) fn drain(&mut self) -> Vec<RoomSubscription> {
        self.buses.clear();
        self.rooms.drain().map(|(_, sub)| sub).collect()
    }
}
