//! Room domain model.
//!
//! - [`Client`] and [`ClientCollection`]: participants and their ordered set
//! - [`Room`]: the aggregate enforcing voting and role rules
//! - [`record`]: the JSON form rooms take in the shared store
//! - [`snapshot`]: the `room-state` view pushed to browsers

mod client;
pub mod record;
mod room;
pub mod snapshot;
pub mod tally;

pub use client::{Client, ClientCollection, ClientView};
pub use record::{decode_room, encode_room};
pub use room::Room;
pub use snapshot::room_state;
