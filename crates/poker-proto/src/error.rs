//! Error types for frame decoding.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Reasons an inbound frame can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The payload is not a JSON object, or a known frame is missing a field.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The payload has no string `type` discriminator.
    #[error("frame has no type discriminator")]
    MissingType,
    /// The discriminator names an event this protocol does not define.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

impl ProtocolError {
    /// Returns a static error code for metrics and logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::MissingType => "missing_type",
            Self::UnknownEventType(_) => "unknown_event_type",
        }
    }
}
