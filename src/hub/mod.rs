//! Room hub: persistence facade plus cross-instance fan-out.
//!
//! The hub stores rooms and client mappings in the shared store, tracks
//! the [`Bus`]es of clients connected to *this* instance, and relays room
//! updates published by any instance to those local buses.

use crate::error::RoomError;
use crate::state::{Client, Room};
use crate::store::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod registry;
mod store_hub;
#[cfg(test)]
pub(crate) mod testing;

pub use store_hub::StoreHub;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum HubError {
    #[error("room {0} not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HubError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::Room(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Serialization(_) => "serialization_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("connection closed")]
    Closed,

    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// Bus
// ============================================================================

/// Outbound channel to one connected client.
#[async_trait]
pub trait Bus: Send + Sync {
    fn client_id(&self) -> &str;

    fn room_id(&self) -> &str;

    /// Deliver a JSON text payload.
    async fn send(&self, payload: &str) -> Result<(), BusError>;

    /// Keepalive ping. Buses without a liveness mechanism succeed.
    async fn ping(&self) -> Result<(), BusError> {
        Ok(())
    }

    /// Close the connection. Closing twice is harmless.
    async fn close(&self);
}

// ============================================================================
// Hub
// ============================================================================

/// Result of removing a client from its room.
#[derive(Debug)]
pub enum Departure {
    /// The room still has participants and was saved.
    Remaining(Room),
    /// The last participant left and the room was deleted.
    RoomClosed,
}

#[async_trait]
pub trait Hub: Send + Sync {
    /// Create and persist an empty room.
    async fn new_room(&self, created_by: &str) -> Result<Room, HubError>;

    /// Load a room. Store failures and undecodable records read as absent
    /// and are logged.
    async fn get_room(&self, room_id: &str) -> Option<Room>;

    async fn save_room(&self, room: &Room) -> Result<(), HubError>;

    async fn remove_room(&self, room_id: &str);

    /// Resolve a client through its client-to-room mapping.
    async fn find_client_by_id(&self, client_id: &str) -> Option<(String, Client)>;

    /// Record that `client_id` belongs to `room` and persist the room.
    async fn add_client(&self, room: &Room, client_id: &str) -> Result<(), HubError>;

    /// Detach a client: drop its mapping and bus, remove it from the room,
    /// then either save the room or delete it if it became empty.
    async fn remove_client(&self, room_id: &str, client_id: &str) -> Result<Departure, HubError>;

    /// Register a local bus. The first bus of a room on this instance
    /// starts the room's update subscription before this returns.
    async fn add_bus(&self, bus: Arc<dyn Bus>) -> Result<(), HubError>;

    async fn get_bus(&self, client_id: &str) -> Option<Arc<dyn Bus>>;

    /// Unregister a local bus. The last bus of a room on this instance
    /// stops the room's update subscription.
    async fn remove_bus(&self, client_id: &str);

    /// Publish a message to every subscriber of the room on every instance.
    async fn broadcast_to_room(
        &self,
        room_id: &str,
        payload: serde_json::Value,
    ) -> Result<(), HubError>;

    async fn get_rooms(&self) -> Vec<Room>;

    /// Number of clients of `room_id` connected to this instance.
    async fn local_client_count(&self, room_id: &str) -> usize;

    /// Stop every subscription and wait for the forwarding tasks to exit.
    async fn shutdown(&self);
}
