//! Inbound frames sent by browsers.
//!
//! Every frame is a JSON object carrying a `type` discriminator. Clients
//! also send `roomId` and `clientId`, which the hub ignores in favour of
//! the identity bound to the connection.

use crate::error::{ProtocolError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Every event type this protocol understands.
pub const EVENT_TYPES: &[&str] = &[
    "update-name",
    "vote",
    "reset",
    "reveal-votes",
    "toggle-spectator",
    "toggle-owner",
    "update-story",
    "new-voting",
    "vote-again",
];

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundFrame {
    /// Change the sender's display name.
    UpdateName {
        /// New display name.
        username: String,
    },
    /// Cast or withdraw a vote. An empty string withdraws.
    Vote {
        /// Raw vote label.
        vote: String,
    },
    /// Hide the result and clear every vote.
    Reset,
    /// Flip the reveal flag.
    RevealVotes,
    /// Flip a participant's spectator flag.
    ToggleSpectator {
        /// Participant being toggled.
        #[serde(rename = "targetClientId")]
        target_client_id: String,
    },
    /// Flip a participant's owner flag.
    ToggleOwner {
        /// Participant being toggled.
        #[serde(rename = "targetClientId")]
        target_client_id: String,
    },
    /// Replace the story under estimation.
    UpdateStory {
        /// Story text.
        story: String,
    },
    /// Start a fresh round: clear votes and the story.
    NewVoting,
    /// Start another round on the same story.
    VoteAgain,
}

impl InboundFrame {
    /// Decode a text frame.
    ///
    /// The discriminator is checked first so that an unknown event type is
    /// distinguishable from a known one with missing fields.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(ProtocolError::Malformed("frame is not an object".to_string()));
        }

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;
        if !EVENT_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownEventType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// The wire name of this frame's event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UpdateName { .. } => "update-name",
            Self::Vote { .. } => "vote",
            Self::Reset => "reset",
            Self::RevealVotes => "reveal-votes",
            Self::ToggleSpectator { .. } => "toggle-spectator",
            Self::ToggleOwner { .. } => "toggle-owner",
            Self::UpdateStory { .. } => "update-story",
            Self::NewVoting => "new-voting",
            Self::VoteAgain => "vote-again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_vote_ignoring_routing_fields() {
        let frame = InboundFrame::decode(
            r#"{"type":"vote","roomId":"r1","clientId":"c1","vote":"8"}"#,
        )
        .unwrap();
        assert_eq!(frame, InboundFrame::Vote { vote: "8".into() });
    }

    #[test]
    fn decodes_unit_frames_with_extra_fields() {
        let frame = InboundFrame::decode(r#"{"type":"reveal-votes","roomId":"r1"}"#).unwrap();
        assert_eq!(frame, InboundFrame::RevealVotes);

        let frame = InboundFrame::decode(r#"{"type":"new-voting"}"#).unwrap();
        assert_eq!(frame, InboundFrame::NewVoting);
    }

    #[test]
    fn decodes_target_client_id() {
        let frame =
            InboundFrame::decode(r#"{"type":"toggle-owner","targetClientId":"abc"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::ToggleOwner {
                target_client_id: "abc".into()
            }
        );
    }

    #[test]
    fn unknown_type_is_distinguished_from_malformed() {
        let err = InboundFrame::decode(r#"{"type":"dance"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEventType("dance".into()));
        assert_eq!(err.error_code(), "unknown_event_type");

        let err = InboundFrame::decode(r#"{"type":"vote"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_discriminator_and_garbage() {
        assert_eq!(
            InboundFrame::decode(r#"{"vote":"1"}"#).unwrap_err(),
            ProtocolError::MissingType
        );
        assert!(matches!(
            InboundFrame::decode("not json").unwrap_err(),
            ProtocolError::Malformed(_)
        ));
        assert!(matches!(
            InboundFrame::decode("[1,2]").unwrap_err(),
            ProtocolError::Malformed(_)
        ));
    }

    #[test]
    fn event_type_matches_wire_name() {
        for name in EVENT_TYPES {
            let text = match *name {
                "update-name" => r#"{"type":"update-name","username":"x"}"#.to_string(),
                "vote" => r#"{"type":"vote","vote":"x"}"#.to_string(),
                "toggle-spectator" | "toggle-owner" => {
                    format!(r#"{{"type":"{name}","targetClientId":"x"}}"#)
                }
                "update-story" => r#"{"type":"update-story","story":"x"}"#.to_string(),
                other => format!(r#"{{"type":"{other}"}}"#),
            };
            let frame = InboundFrame::decode(&text).unwrap();
            assert_eq!(frame.event_type(), *name);
        }
    }
}
