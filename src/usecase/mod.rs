//! Use cases: one per room operation.
//!
//! Every mutating use case follows the same shape under the room's lock:
//! load the room, apply the change, save it, publish the new `room-state`.
//! Publishing inside the critical section keeps the order of published
//! snapshots equal to the order of mutations for a room.

use crate::error::{RoomError, UseCaseError, UseCaseResult};
use crate::hub::Hub;
use crate::lock::LockManager;
use crate::metrics::Metrics;
use crate::state::{Room, room_state};
use crate::telemetry::spans;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

mod details;
mod membership;
mod roles;
mod voting;

#[cfg(test)]
pub(crate) mod testing;

pub use details::{NameCommand, StoryCommand, UpdateName, UpdateStory};
pub use membership::{
    BusFactory, CreateRoom, CreateRoomCommand, JoinRoom, JoinRoomCommand, Joined, LeaveRoom,
};
pub use roles::{TargetCommand, ToggleOwner, ToggleSpectator};
pub use voting::{NewVoting, ResetVoting, RevealVotes, Vote, VoteAgain, VoteCommand};

/// A single application operation.
#[async_trait]
pub trait UseCase<C: Send + 'static>: Send + Sync {
    type Output: Send;

    async fn execute(&self, cancel: &CancellationToken, cmd: C) -> UseCaseResult<Self::Output>;
}

/// Collaborators shared by every use case.
#[derive(Clone)]
pub struct Deps {
    pub hub: Arc<dyn Hub>,
    pub locks: Arc<dyn LockManager>,
    pub metrics: Arc<dyn Metrics>,
    /// Parent of every use case span.
    pub span: Span,
}

/// Identifies the acting client and its room.
#[derive(Debug, Clone)]
pub struct RoomCommand {
    pub room_id: String,
    pub client_id: String,
}

/// Every use case, wired to the same collaborators.
#[derive(Clone)]
pub struct UseCases {
    pub create_room: CreateRoom,
    pub join_room: JoinRoom,
    pub leave_room: LeaveRoom,
    pub vote: Vote,
    pub reveal_votes: RevealVotes,
    pub reset_voting: ResetVoting,
    pub vote_again: VoteAgain,
    pub new_voting: NewVoting,
    pub toggle_spectator: ToggleSpectator,
    pub toggle_owner: ToggleOwner,
    pub update_story: UpdateStory,
    pub update_name: UpdateName,
}

impl UseCases {
    pub fn new(deps: Deps) -> Self {
        Self {
            create_room: CreateRoom::new(deps.clone()),
            join_room: JoinRoom::new(deps.clone()),
            leave_room: LeaveRoom::new(deps.clone()),
            vote: Vote::new(deps.clone()),
            reveal_votes: RevealVotes::new(deps.clone()),
            reset_voting: ResetVoting::new(deps.clone()),
            vote_again: VoteAgain::new(deps.clone()),
            new_voting: NewVoting::new(deps.clone()),
            toggle_spectator: ToggleSpectator::new(deps.clone()),
            toggle_owner: ToggleOwner::new(deps.clone()),
            update_story: UpdateStory::new(deps.clone()),
            update_name: UpdateName::new(deps),
        }
    }
}

/// Load, mutate, save and publish a room while holding its lock.
pub(crate) async fn mutate_room<F>(
    deps: &Deps,
    cancel: &CancellationToken,
    name: &'static str,
    room_id: &str,
    mutate: F,
) -> UseCaseResult
where
    F: FnOnce(&mut Room) -> Result<(), RoomError> + Send,
{
    let span = spans::use_case(&deps.span, name, room_id);
    let requested = Instant::now();
    deps.locks
        .execute_with_lock(cancel, room_id, move || async move {
            deps.metrics.lock_waited(requested.elapsed());
            let mut room = load_room(deps, room_id).await?;
            mutate(&mut room)?;
            deps.hub.save_room(&room).await?;
            broadcast_state(deps, &room).await
        })
        .instrument(span)
        .await
}

pub(crate) async fn load_room(deps: &Deps, room_id: &str) -> UseCaseResult<Room> {
    deps.hub
        .get_room(room_id)
        .await
        .ok_or_else(|| UseCaseError::RoomNotFound(room_id.to_string()))
}

/// Publish the room's `room-state` snapshot to every subscriber.
pub(crate) async fn broadcast_state(deps: &Deps, room: &Room) -> UseCaseResult {
    let payload = serde_json::to_value(room_state(room))?;
    deps.hub.broadcast_to_room(room.id(), payload).await?;
    Ok(())
}
