//! Key layout in the shared store.

use std::time::Duration;

pub const ROOM_PREFIX: &str = "planning-poker:room:";
pub const CLIENT_PREFIX: &str = "planning-poker:client:";
pub const LOCK_PREFIX: &str = "planning-poker:lock:";
pub const UPDATES_PREFIX: &str = "planning-poker:updates:";

/// Rooms and client mappings expire a day after their last write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn room(room_id: &str) -> String {
    format!("{ROOM_PREFIX}{room_id}")
}

pub fn client(client_id: &str) -> String {
    format!("{CLIENT_PREFIX}{client_id}")
}

pub fn lock(name: &str) -> String {
    format!("{LOCK_PREFIX}{name}")
}

pub fn updates(room_id: &str) -> String {
    format!("{UPDATES_PREFIX}{room_id}")
}

/// Recover a room id from a room key.
pub fn room_id(key: &str) -> Option<&str> {
    key.strip_prefix(ROOM_PREFIX)
}
