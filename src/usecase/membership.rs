//! Room lifecycle: create, join, leave.

use super::{Deps, RoomCommand, UseCase, broadcast_state, load_room};
use crate::error::{UseCaseError, UseCaseResult};
use crate::hub::{Bus, Departure};
use crate::state::{Client, Room};
use crate::telemetry::spans;
use async_trait::async_trait;
use poker_proto::OutboundMessage;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

// ============================================================================
// CreateRoom
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateRoomCommand {
    pub created_by: String,
}

#[derive(Clone)]
pub struct CreateRoom {
    deps: Deps,
}

impl CreateRoom {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<CreateRoomCommand> for CreateRoom {
    type Output = Room;

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        cmd: CreateRoomCommand,
    ) -> UseCaseResult<Room> {
        let room = self.deps.hub.new_room(&cmd.created_by).await?;
        self.deps.metrics.room_opened();
        Ok(room)
    }
}

// ============================================================================
// JoinRoom
// ============================================================================

/// Builds the connection's bus once the client id is assigned.
pub type BusFactory = Box<dyn FnOnce(&str) -> Arc<dyn Bus> + Send>;

pub struct JoinRoomCommand {
    pub room_id: String,
    pub bus_factory: BusFactory,
}

/// A successful join.
pub struct Joined {
    pub client: Client,
    pub bus: Arc<dyn Bus>,
}

#[derive(Clone)]
pub struct JoinRoom {
    deps: Deps,
}

impl JoinRoom {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<JoinRoomCommand> for JoinRoom {
    type Output = Joined;

    /// Admit a new client. The client learns its id before the room's lock
    /// is taken, so a slow socket never holds the lease. Its bus is
    /// subscribed before anything is persisted, so a failed join leaves no
    /// trace in the room.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        cmd: JoinRoomCommand,
    ) -> UseCaseResult<Joined> {
        let JoinRoomCommand {
            room_id,
            bus_factory,
        } = cmd;
        let deps = &self.deps;
        let span = spans::use_case(&deps.span, "join_room", &room_id);

        let client_id = Uuid::new_v4().to_string();
        let bus = bus_factory(&client_id);
        send_client_id(bus.as_ref(), &client_id)
            .instrument(span.clone())
            .await?;

        let requested = Instant::now();
        deps.locks
            .with_lock(cancel, &room_id, || async {
                deps.metrics.lock_waited(requested.elapsed());
                let mut room = load_room(deps, &room_id).await?;
                let client = room.new_client(client_id.clone());
                deps.hub.add_bus(Arc::clone(&bus)).await?;

                if let Err(e) = deps.hub.add_client(&room, &client_id).await {
                    deps.hub.remove_bus(&client_id).await;
                    return Err(e.into());
                }
                deps.metrics.user_joined();
                info!(client_id = %client_id, owner = client.is_owner, "Client joined");

                // The join is committed; a lost snapshot is repaired by the
                // next mutation.
                if let Err(e) = broadcast_state(deps, &room).await {
                    warn!(error = %e, "Failed to publish room state after join");
                }
                Ok::<_, UseCaseError>(Joined {
                    client,
                    bus: Arc::clone(&bus),
                })
            })
            .instrument(span)
            .await
    }
}

async fn send_client_id(bus: &dyn Bus, client_id: &str) -> UseCaseResult {
    let notice = OutboundMessage::UpdateClientId {
        client_id: client_id.to_string(),
    }
    .to_json()?;
    bus.send(&notice).await?;
    Ok(())
}

// ============================================================================
// LeaveRoom
// ============================================================================

#[derive(Clone)]
pub struct LeaveRoom {
    deps: Deps,
}

impl LeaveRoom {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UseCase<RoomCommand> for LeaveRoom {
    type Output = ();

    async fn execute(&self, cancel: &CancellationToken, cmd: RoomCommand) -> UseCaseResult {
        let deps = &self.deps;
        let span = spans::use_case(&deps.span, "leave_room", &cmd.room_id);
        let requested = Instant::now();

        deps.locks
            .execute_with_lock(cancel, &cmd.room_id, || async {
                deps.metrics.lock_waited(requested.elapsed());
                let departure = deps.hub.remove_client(&cmd.room_id, &cmd.client_id).await;
                deps.metrics.user_left();

                match departure? {
                    Departure::Remaining(room) => {
                        info!(client_id = %cmd.client_id, "Client left");
                        broadcast_state(deps, &room).await
                    }
                    Departure::RoomClosed => {
                        deps.metrics.room_closed();
                        Ok(())
                    }
                }
            })
            .instrument(span)
            .await
    }
}
