//! # poker-proto
//!
//! Wire protocol spoken between planning poker browsers and the session hub.
//!
//! ## Features
//!
//! - Inbound frame decoding with a `type` discriminator checked before the body
//! - Outbound `room-state` snapshots and `update-client-id` notices
//! - Origin policy for WebSocket upgrade requests
//!
//! ## Quick Start
//!
//! ```rust
//! use poker_proto::InboundFrame;
//!
//! let frame = InboundFrame::decode(r#"{"type":"vote","vote":"5"}"#).unwrap();
//! assert_eq!(frame, InboundFrame::Vote { vote: "5".to_string() });
//! assert_eq!(frame.event_type(), "vote");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;

pub use error::ProtocolError;
pub use frame::{EVENT_TYPES, InboundFrame};
pub use handshake::{HandshakeResult, OriginPolicy};
pub use message::{OutboundMessage, Participant, RoomState};
