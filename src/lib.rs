//! poker-hub - real-time planning poker sessions.
//!
//! Browsers join a room over WebSocket, vote on the story under
//! estimation and see every change as a full `room-state` snapshot. Rooms
//! live in a shared store so any number of hub instances can serve the
//! same room: mutations are serialized by a per-room lease and fanned out
//! through the store's pub/sub channel.
//!
//! Layers, bottom up:
//! - [`state`]: the room state machine and its wire/persisted forms
//! - [`store`]: the shared key-value and pub/sub capability (memory, Redis)
//! - [`lock`]: per-room mutual exclusion
//! - [`hub`]: room persistence plus per-instance subscription bookkeeping
//! - [`usecase`]: one orchestrator per room operation
//! - [`network`]: HTTP routes, WebSocket sessions and buses

pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod lock;
pub mod metrics;
pub mod network;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod usecase;
