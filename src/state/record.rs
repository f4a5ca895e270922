//! Persisted room record.
//!
//! Rooms are stored as JSON so that any hub instance can load them:
//!
//! ```json
//! {"id":"…","owner":"…","clients":[{"id":"…","name":"…","currentVote":"5",
//!  "hasVoted":true,"isSpectator":false,"isOwner":true}],
//!  "currentStory":"…","reveal":true,"result":5.0,"mostAppearingVotes":[5.0]}
//! ```

use super::client::{Client, ClientCollection};
use super::room::Room;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRecord {
    id: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    clients: Vec<ClientRecord>,
    #[serde(default)]
    current_story: String,
    #[serde(default)]
    reveal: bool,
    #[serde(default)]
    result: Option<f64>,
    #[serde(default)]
    most_appearing_votes: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    current_vote: Option<String>,
    #[serde(default)]
    has_voted: bool,
    #[serde(default)]
    is_spectator: bool,
    #[serde(default)]
    is_owner: bool,
}

impl From<&Client> for ClientRecord {
    fn from(c: &Client) -> Self {
        Self {
            id: c.id().to_string(),
            name: c.name.clone(),
            current_vote: c.current_vote.clone(),
            has_voted: c.has_voted,
            is_spectator: c.is_spectator,
            is_owner: c.is_owner,
        }
    }
}

impl From<ClientRecord> for Client {
    fn from(r: ClientRecord) -> Self {
        let mut client = Client::new(r.id);
        client.name = r.name;
        client.current_vote = r.current_vote;
        client.has_voted = r.has_voted;
        client.is_spectator = r.is_spectator;
        client.is_owner = r.is_owner;
        client
    }
}

/// Encode a room for the shared store.
pub fn encode_room(room: &Room) -> serde_json::Result<String> {
    let record = RoomRecord {
        id: room.id().to_string(),
        owner: room.owner().to_string(),
        clients: room.clients().iter().map(ClientRecord::from).collect(),
        current_story: room.current_story().to_string(),
        reveal: room.is_revealed(),
        result: room.result(),
        most_appearing_votes: room.most_appearing_votes().to_vec(),
    };
    serde_json::to_string(&record)
}

/// Decode a room read from the shared store. Duplicate client ids keep
/// their first occurrence.
pub fn decode_room(data: &str) -> serde_json::Result<Room> {
    let record: RoomRecord = serde_json::from_str(data)?;
    let clients: ClientCollection = record.clients.into_iter().map(Client::from).collect();
    Ok(Room::from_parts(
        record.id,
        record.owner,
        record.current_story,
        record.reveal,
        record.result,
        record.most_appearing_votes,
        clients,
    ))
}
