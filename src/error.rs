//! Unified error handling for the session hub.
//!
//! Domain and use case errors live here. Infrastructure errors stay next
//! to the code that raises them (`StoreError` in `store`, `LockError` in
//! `lock`, `HubError` and `BusError` in `hub`) and convert into
//! [`UseCaseError`] through `#[from]`.

use crate::hub::{BusError, HubError};
use crate::lock::LockError;
use thiserror::Error;

// ============================================================================
// Room Errors (domain rules)
// ============================================================================

/// Failures raised by [`Room`](crate::state::Room) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("client {0} not found in room")]
    ClientNotFound(String),

    #[error("target client {0} not found in room")]
    TargetNotFound(String),

    #[error("client {client_id} is not authorized to {action}")]
    NotAuthorized {
        client_id: String,
        action: &'static str,
    },
}

impl RoomError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ClientNotFound(_) => "client_not_found",
            Self::TargetNotFound(_) => "target_not_found",
            Self::NotAuthorized { .. } => "not_authorized",
        }
    }
}

// ============================================================================
// Use Case Errors (room mutations)
// ============================================================================

/// Errors surfaced by use cases to the connection session.
#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("room {0} not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("failed to reach client: {0}")]
    Bus(#[from] BusError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl UseCaseError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::Room(e) => e.error_code(),
            Self::Lock(e) => e.error_code(),
            Self::Hub(e) => e.error_code(),
            Self::Bus(_) => "bus_error",
            Self::Encode(_) => "encode_error",
        }
    }
}

/// Result type for use cases.
pub type UseCaseResult<T = ()> = Result<T, UseCaseError>;
