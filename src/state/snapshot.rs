//! Browser-facing snapshot of a room.

use super::room::Room;
use poker_proto::{OutboundMessage, Participant, RoomState};

/// Build the `room-state` message for a room. Participants are ordered by
/// display name, then id, so every subscriber renders the same list.
pub fn room_state(room: &Room) -> OutboundMessage {
    let mut participants: Vec<Participant> = room
        .clients()
        .iter()
        .map(|c| Participant {
            id: c.id().to_string(),
            name: c.name.clone(),
            vote: c.current_vote.clone(),
            has_voted: c.has_voted,
            is_spectator: c.is_spectator,
            is_owner: c.is_owner,
        })
        .collect();
    participants.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    OutboundMessage::RoomState(RoomState {
        current_story: room.current_story().to_string(),
        reveal: room.is_revealed(),
        result: room.result(),
        most_appearing_votes: room.most_appearing_votes().to_vec(),
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_sorted_by_name() {
        let mut room = Room::with_id("r", "creator");
        for (id, name) in [("1", "Zoe"), ("2", "Ada"), ("3", "Max")] {
            room.new_client(id);
            room.update_client_name(id, name).unwrap();
        }

        let OutboundMessage::RoomState(state) = room_state(&room) else {
            panic!("expected room-state");
        };
        let names: Vec<_> = state.participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Max", "Zoe"]);
        assert!(state.participants[2].is_owner);
    }

    #[test]
    fn carries_result_after_reveal() {
        let mut room = Room::with_id("r", "creator");
        room.new_client("a");
        room.vote("a", Some("5".into())).unwrap();

        let OutboundMessage::RoomState(state) = room_state(&room) else {
            panic!("expected room-state");
        };
        assert!(state.reveal);
        assert_eq!(state.result, Some(5.0));
        assert_eq!(state.participants[0].vote.as_deref(), Some("5"));
    }
}
