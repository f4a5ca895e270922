//! Outbound messages pushed to browsers.

use serde::{Deserialize, Serialize};

/// A message sent from the hub to a connected browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Full snapshot of a room, broadcast after every mutation.
    RoomState(RoomState),
    /// Tells a freshly joined browser which client id it was assigned.
    UpdateClientId {
        /// The assigned client id.
        #[serde(rename = "clientId")]
        client_id: String,
    },
}

impl OutboundMessage {
    /// Serialize to the JSON text carried in a WebSocket frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Snapshot of a room as browsers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    /// Story under estimation.
    pub current_story: String,
    /// Whether votes are visible.
    pub reveal: bool,
    /// Mean of the numeric votes once revealed.
    pub result: Option<f64>,
    /// Most frequent numeric votes once revealed, ascending.
    #[serde(default)]
    pub most_appearing_votes: Vec<f64>,
    /// Participants sorted by display name.
    pub participants: Vec<Participant>,
}

/// One participant inside a [`RoomState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Client id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current vote, if any.
    pub vote: Option<String>,
    /// Whether a vote has been cast this round.
    pub has_voted: bool,
    /// Spectators never vote.
    pub is_spectator: bool,
    /// Owners may moderate the room.
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_state_wire_shape() {
        let msg = OutboundMessage::RoomState(RoomState {
            current_story: "Login page".into(),
            reveal: false,
            result: None,
            most_appearing_votes: vec![],
            participants: vec![Participant {
                id: "c1".into(),
                name: "Ada".into(),
                vote: None,
                has_voted: false,
                is_spectator: false,
                is_owner: true,
            }],
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "room-state",
                "currentStory": "Login page",
                "reveal": false,
                "result": null,
                "mostAppearingVotes": [],
                "participants": [{
                    "id": "c1",
                    "name": "Ada",
                    "vote": null,
                    "hasVoted": false,
                    "isSpectator": false,
                    "isOwner": true
                }]
            })
        );
    }

    #[test]
    fn update_client_id_wire_shape() {
        let msg = OutboundMessage::UpdateClientId {
            client_id: "abc".into(),
        };
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"type":"update-client-id","clientId":"abc"}"#
        );
    }
}
