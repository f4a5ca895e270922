//! Owner-driven role changes.

use super::{Deps, UseCase, mutate_room};
use crate::error::UseCaseResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An acting client applying a change to another participant.
#[derive(Debug, Clone)]
pub struct TargetCommand {
    pub room_id: String,
    pub client_id: String,
    pub target_client_id: String,
}

#[derive(Clone)]
pub struct ToggleSpectator {
    deps: Deps,
}

impl ToggleSpectator {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<TargetCommand> for ToggleSpectator {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: TargetCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "toggle_spectator", &cmd.room_id, |room| {
            room.toggle_spectator(&cmd.client_id, &cmd.target_client_id)
        })
        .await
    }
}

#[derive(Clone)]
pub struct ToggleOwner {
    deps: Deps,
}

impl ToggleOwner {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<TargetCommand> for ToggleOwner {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: TargetCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "toggle_owner", &cmd.room_id, |room| {
            room.toggle_owner(&cmd.client_id, &cmd.target_client_id)
        })
        .await
    }
}
