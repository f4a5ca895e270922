//! Voting rounds: casting votes, revealing and restarting.

use super::{Deps, RoomCommand, UseCase, mutate_room};
use crate::error::UseCaseResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct VoteCommand {
    pub room_id: String,
    pub client_id: String,
    /// `None` or an empty label withdraws the vote.
    pub vote: Option<String>,
}

#[derive(Clone)]
pub struct Vote {
    deps: Deps,
}

impl Vote {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<VoteCommand> for Vote {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: VoteCommand) -> UseCaseResult {
        let VoteCommand {
            room_id,
            client_id,
            vote,
        } = cmd;
        mutate_room(&self.deps, cancel, "vote", &room_id, move |room| {
            room.vote(&client_id, vote)
        })
        .await
    }
}

/// Show or hide the round's results. Owners only.
#[derive(Clone)]
pub struct RevealVotes {
    deps: Deps,
}

impl RevealVotes {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<RoomCommand> for RevealVotes {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: RoomCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "reveal_votes", &cmd.room_id, |room| {
            room.toggle_reveal(&cmd.client_id)
        })
        .await
    }
}

/// Clear the round's votes, keeping the story. Owners only.
#[derive(Clone)]
pub struct ResetVoting {
    deps: Deps,
}

impl ResetVoting {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<RoomCommand> for ResetVoting {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: RoomCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "reset_voting", &cmd.room_id, |room| {
            room.reset_voting(&cmd.client_id)
        })
        .await
    }
}

/// Re-vote the same story. Same effect as [`ResetVoting`], reported under
/// its own name.
#[derive(Clone)]
pub struct VoteAgain {
    deps: Deps,
}

impl VoteAgain {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<RoomCommand> for VoteAgain {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: RoomCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "vote_again", &cmd.room_id, |room| {
            room.reset_voting(&cmd.client_id)
        })
        .await
    }
}

/// Start over with a blank story. Owners only.
#[derive(Clone)]
pub struct NewVoting {
    deps: Deps,
}

impl NewVoting {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<RoomCommand> for NewVoting {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: RoomCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "new_voting", &cmd.room_id, |room| {
            room.new_voting(&cmd.client_id)
        })
        .await
    }
}
