//! Descriptive edits: the story under estimation and participant names.

use super::{Deps, UseCase, mutate_room};
use crate::error::UseCaseResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct StoryCommand {
    pub room_id: String,
    pub client_id: String,
    pub story: String,
}

/// Replace the story. Owners only.
#[derive(Clone)]
pub struct UpdateStory {
    deps: Deps,
}

impl UpdateStory {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<StoryCommand> for UpdateStory {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: StoryCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "update_story", &cmd.room_id, |room| {
            room.set_current_story(&cmd.client_id, &cmd.story)
        })
        .await
    }
}

#[derive(Debug, Clone)]
pub struct NameCommand {
    pub room_id: String,
    pub client_id: String,
    pub name: String,
}

/// Rename the acting client. Anyone may rename themselves.
#[derive(Clone)]
pub struct UpdateName {
    deps: Deps,
}

impl UpdateName {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<NameCommand> for UpdateName {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: NameCommand) -> UseCaseResult {
        mutate_room(&self.deps, cancel, "update_name", &cmd.room_id, |room| {
            room.update_client_name(&cmd.client_id, &cmd.name)
        })
        .await
    }
}
