//! The room aggregate: participants, voting round state and the rules
//! that govern them.
//!
//! A `Room` value is loaded from the shared store, mutated under the
//! room's distributed lock and written back. Mutating methods take
//! `&mut self`, so a single borrower has exclusive access for the
//! duration of an operation.

use super::client::{Client, ClientCollection};
use super::tally::tally;
use crate::error::RoomError;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    id: String,
    owner: String,
    current_story: String,
    reveal: bool,
    result: Option<f64>,
    most_appearing_votes: Vec<f64>,
    clients: ClientCollection,
}

impl Room {
    /// Create an empty room with a fresh id.
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), owner)
    }

    pub fn with_id(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            current_story: String::new(),
            reveal: false,
            result: None,
            most_appearing_votes: Vec::new(),
            clients: ClientCollection::new(),
        }
    }

    /// Reassemble a room from persisted parts.
    pub(crate) fn from_parts(
        id: String,
        owner: String,
        current_story: String,
        reveal: bool,
        result: Option<f64>,
        most_appearing_votes: Vec<f64>,
        clients: ClientCollection,
    ) -> Self {
        Self {
            id,
            owner,
            current_story,
            reveal,
            result,
            most_appearing_votes,
            clients,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of whoever created the room.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn current_story(&self) -> &str {
        &self.current_story
    }

    pub fn is_revealed(&self) -> bool {
        self.reveal
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    pub fn most_appearing_votes(&self) -> &[f64] {
        &self.most_appearing_votes
    }

    pub fn clients(&self) -> &ClientCollection {
        &self.clients
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn owner_count(&self) -> usize {
        self.clients.filter(|c| c.is_owner).len()
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Add a participant. The first participant of a room becomes its owner.
    /// Adding an id that is already present returns the existing client.
    pub fn new_client(&mut self, id: impl Into<String>) -> Client {
        let id = id.into();
        if let Some(existing) = self.clients.get(&id) {
            return existing.clone();
        }
        let mut client = Client::new(id);
        client.is_owner = self.clients.is_empty();
        self.clients.add(client.clone());
        client
    }

    /// Remove a participant. If the last owner leaves while others remain,
    /// the earliest remaining participant is promoted. Removing a voter who
    /// had not voted may complete the round and trigger auto-reveal.
    pub fn remove_client(&mut self, id: &str) -> Result<Client, RoomError> {
        let removed = self
            .clients
            .remove(id)
            .ok_or_else(|| RoomError::ClientNotFound(id.to_string()))?;

        if self.owner_count() == 0 {
            if let Some(heir) = self.clients.first_mut() {
                heir.is_owner = true;
                debug!(room_id = %self.id, client_id = %heir.id(), "Promoted new owner");
            }
        }

        self.check_reveal();
        Ok(removed)
    }

    pub fn update_client_name(&mut self, id: &str, name: &str) -> Result<(), RoomError> {
        let client = self.client_mut(id)?;
        client.name = name.to_string();
        Ok(())
    }

    // ========================================================================
    // Voting
    // ========================================================================

    /// Cast or withdraw a vote. Votes are frozen while results are revealed;
    /// a frozen vote is ignored rather than refused.
    pub fn vote(&mut self, id: &str, vote: Option<String>) -> Result<(), RoomError> {
        let reveal = self.reveal;
        let client = self.client_mut(id)?;
        if reveal {
            debug!(client_id = %id, "Ignoring vote while results are revealed");
            return Ok(());
        }
        client.set_vote(vote);
        self.check_reveal();
        Ok(())
    }

    pub fn toggle_reveal(&mut self, by: &str) -> Result<(), RoomError> {
        self.authorize(by, "toggle reveal")?;
        self.set_reveal(!self.reveal);
        Ok(())
    }

    /// Hide results and clear every vote, keeping the story.
    pub fn reset_voting(&mut self, by: &str) -> Result<(), RoomError> {
        self.authorize(by, "reset voting")?;
        self.clear_round();
        Ok(())
    }

    /// Hide results, clear every vote and the story.
    pub fn new_voting(&mut self, by: &str) -> Result<(), RoomError> {
        self.authorize(by, "start a new voting")?;
        self.clear_round();
        self.current_story.clear();
        Ok(())
    }

    pub fn set_current_story(&mut self, by: &str, story: &str) -> Result<(), RoomError> {
        self.authorize(by, "set the story")?;
        self.current_story = story.to_string();
        Ok(())
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Flip a participant's spectator flag and clear their vote. The tally is
    /// recomputed if results are showing, otherwise the round may complete.
    pub fn toggle_spectator(&mut self, by: &str, target: &str) -> Result<(), RoomError> {
        self.authorize(by, "toggle spectators")?;
        let client = self.target_mut(target)?;
        client.is_spectator = !client.is_spectator;
        client.clear_vote();

        if self.reveal {
            self.recompute_result();
        } else {
            self.check_reveal();
        }
        Ok(())
    }

    /// Flip a participant's owner flag. Demoting the sole owner is a no-op so
    /// a populated room always keeps at least one owner.
    pub fn toggle_owner(&mut self, by: &str, target: &str) -> Result<(), RoomError> {
        self.authorize(by, "toggle owners")?;
        let sole_owner = self.owner_count() == 1;
        let client = self.target_mut(target)?;
        if sole_owner && client.is_owner {
            debug!(client_id = %target, "Refusing to demote the sole owner");
            return Ok(());
        }
        client.is_owner = !client.is_owner;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn client_mut(&mut self, id: &str) -> Result<&mut Client, RoomError> {
        self.clients
            .get_mut(id)
            .ok_or_else(|| RoomError::ClientNotFound(id.to_string()))
    }

    fn target_mut(&mut self, id: &str) -> Result<&mut Client, RoomError> {
        self.clients
            .get_mut(id)
            .ok_or_else(|| RoomError::TargetNotFound(id.to_string()))
    }

    fn authorize(&self, id: &str, action: &'static str) -> Result<(), RoomError> {
        let client = self
            .clients
            .get(id)
            .ok_or_else(|| RoomError::ClientNotFound(id.to_string()))?;
        if !client.is_owner {
            return Err(RoomError::NotAuthorized {
                client_id: id.to_string(),
                action,
            });
        }
        Ok(())
    }

    fn clear_round(&mut self) {
        self.set_reveal(false);
        for client in self.clients.iter_mut() {
            client.clear_vote();
        }
    }

    /// Reveal once every non-spectator has voted. A room with no
    /// non-spectators never auto-reveals.
    fn check_reveal(&mut self) {
        if self.reveal {
            return;
        }
        let voters = self.clients.filter(|c| !c.is_spectator);
        if !voters.is_empty() && voters.all(|c| c.has_voted) {
            debug!(room_id = %self.id, "All votes are in, revealing");
            self.set_reveal(true);
        }
    }

    fn set_reveal(&mut self, reveal: bool) {
        self.reveal = reveal;
        if reveal {
            self.recompute_result();
        } else {
            self.result = None;
            self.most_appearing_votes.clear();
        }
    }

    fn recompute_result(&mut self) {
        let votes = self
            .clients
            .filter(|c| !c.is_spectator && c.has_voted)
            .iter()
            .filter_map(|c| c.current_vote.as_deref())
            .collect::<Vec<_>>();
        let tally = tally(votes);
        self.result = tally.mean;
        self.most_appearing_votes = tally.modes;
    }
}
