//! Default value functions for configuration.

use std::net::SocketAddr;

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

pub fn default_metrics_port() -> u16 {
    9090
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub fn default_ping_interval() -> u64 {
    30
}

pub fn default_read_timeout() -> u64 {
    60
}

pub fn default_write_timeout() -> u64 {
    10
}

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_room_ttl() -> u64 {
    24 * 60 * 60
}

// =============================================================================
// Lock Defaults
// =============================================================================

pub fn default_lock_timeout() -> u64 {
    10_000
}

pub fn default_retry_delay() -> u64 {
    50
}

pub fn default_max_retries() -> u32 {
    100
}

// =============================================================================
// Log Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}
