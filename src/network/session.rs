//! Session - drives one browser connection for the lifetime of its seat.
//!
//! ```text
//! upgrade ──▶ JoinRoom ──▶ read loop ◀── deadline renewed by every frame
//!                │             │
//!                │             └──▶ InboundFrame ──▶ use case
//!                └──▶ pinger (interval)
//!
//! any exit ──▶ Teardown: close the socket, then LeaveRoom
//! ```
//!
//! Outbound traffic never originates here: use cases publish room state
//! through the hub and the room's forwarding task writes it to the bus.

use super::bus::WsBus;
use crate::error::UseCaseResult;
use crate::hub::{Bus, Hub};
use crate::metrics;
use crate::telemetry::{EventTimer, spans};
use crate::usecase::{
    JoinRoomCommand, LeaveRoom, NameCommand, RoomCommand, StoryCommand, TargetCommand, UseCase,
    UseCases, VoteCommand,
};
use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;
use poker_proto::InboundFrame;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval_at, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

/// Keepalive and write budgets for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub ping_interval: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

/// A joined-or-joining WebSocket connection.
pub struct Session {
    room_id: String,
    use_cases: UseCases,
    hub: Arc<dyn Hub>,
    settings: SessionSettings,
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(
        room_id: String,
        use_cases: UseCases,
        hub: Arc<dyn Hub>,
        settings: SessionSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            room_id,
            use_cases,
            hub,
            settings,
            shutdown,
        }
    }

    /// Join the room and serve the connection until it ends.
    pub async fn run(self, socket: WebSocket) {
        let span = spans::session(&self.room_id);
        self.serve(socket).instrument(span).await
    }

    async fn serve(self, socket: WebSocket) {
        let (sink, mut stream) = socket.split();
        let cancel = self.shutdown.child_token();

        let room_id = self.room_id.clone();
        let write_timeout = self.settings.write_timeout;
        let joined = self
            .use_cases
            .join_room
            .execute(
                &cancel,
                JoinRoomCommand {
                    room_id: self.room_id.clone(),
                    bus_factory: Box::new(move |client_id: &str| {
                        Arc::new(WsBus::new(client_id, &room_id, sink, write_timeout))
                            as Arc<dyn Bus>
                    }),
                },
            )
            .await;
        let joined = match joined {
            Ok(joined) => joined,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Join failed, dropping connection");
                return;
            }
        };

        let client_id = joined.client.id().to_string();
        Span::current().record("client_id", client_id.as_str());

        let teardown = LeaveGuard::new(Teardown {
            leave: self.use_cases.leave_room.clone(),
            hub: Arc::clone(&self.hub),
            bus: Arc::clone(&joined.bus),
            cmd: RoomCommand {
                room_id: self.room_id.clone(),
                client_id: client_id.clone(),
            },
        });

        // Stops the pinger on every exit path, unwinding included.
        let _stop_pinger = cancel.clone().drop_guard();
        tokio::spawn(
            keepalive(
                Arc::clone(&joined.bus),
                self.settings.ping_interval,
                cancel.clone(),
            )
            .in_current_span(),
        );

        let read_timeout = self.settings.read_timeout;
        let mut deadline = Instant::now() + read_timeout;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Server shutting down");
                    break;
                }
                next = timeout_at(deadline, stream.next()) => next,
            };

            let message = match next {
                Err(_) => {
                    info!(timeout = ?read_timeout, "Read deadline elapsed");
                    break;
                }
                Ok(None) => {
                    info!("Client disconnected");
                    break;
                }
                Ok(Some(Err(e))) => {
                    debug!(error = %e, "Read error");
                    break;
                }
                Ok(Some(Ok(message))) => message,
            };
            deadline = Instant::now() + read_timeout;

            match message {
                Message::Text(text) => self.dispatch(&cancel, &client_id, &text).await,
                Message::Close(_) => {
                    info!("Client closed the connection");
                    break;
                }
                // Pings are answered by the transport; any frame renews the deadline.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => debug!("Ignoring binary frame"),
            }
        }

        teardown.run().await;
    }

    /// Decode a text frame and run the matching use case. Failures are
    /// logged and counted; the session keeps going.
    async fn dispatch(&self, cancel: &CancellationToken, client_id: &str, text: &str) {
        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                metrics::record_event_error("invalid", e.error_code());
                warn!(error = %e, "Ignoring frame");
                return;
            }
        };

        let event = frame.event_type();
        let mut timer = EventTimer::new(event);
        if let Err(e) = self.apply(cancel, client_id, frame).await {
            timer.fail(e.error_code());
            warn!(event, error = %e, code = e.error_code(), "Event failed");
        }
    }

    async fn apply(
        &self,
        cancel: &CancellationToken,
        client_id: &str,
        frame: InboundFrame,
    ) -> UseCaseResult {
        let uc = &self.use_cases;
        let room = RoomCommand {
            room_id: self.room_id.clone(),
            client_id: client_id.to_string(),
        };
        let RoomCommand { room_id, client_id } = room.clone();

        match frame {
            InboundFrame::UpdateName { username } => {
                let cmd = NameCommand {
                    room_id,
                    client_id,
                    name: username,
                };
                uc.update_name.execute(cancel, cmd).await
            }
            InboundFrame::Vote { vote } => {
                let cmd = VoteCommand {
                    room_id,
                    client_id,
                    vote: Some(vote),
                };
                uc.vote.execute(cancel, cmd).await
            }
            InboundFrame::Reset => uc.reset_voting.execute(cancel, room).await,
            InboundFrame::RevealVotes => uc.reveal_votes.execute(cancel, room).await,
            InboundFrame::ToggleSpectator { target_client_id } => {
                let cmd = TargetCommand {
                    room_id,
                    client_id,
                    target_client_id,
                };
                uc.toggle_spectator.execute(cancel, cmd).await
            }
            InboundFrame::ToggleOwner { target_client_id } => {
                let cmd = TargetCommand {
                    room_id,
                    client_id,
                    target_client_id,
                };
                uc.toggle_owner.execute(cancel, cmd).await
            }
            InboundFrame::UpdateStory { story } => {
                let cmd = StoryCommand {
                    room_id,
                    client_id,
                    story,
                };
                uc.update_story.execute(cancel, cmd).await
            }
            InboundFrame::NewVoting => uc.new_voting.execute(cancel, room).await,
            InboundFrame::VoteAgain => uc.vote_again.execute(cancel, room).await,
        }
    }
}

/// Ping the client every `interval` until cancelled or the bus fails.
async fn keepalive(bus: Arc<dyn Bus>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = bus.ping().await {
                    debug!(error = %e, "Ping failed, stopping keepalive");
                    return;
                }
            }
        }
    }
}

// ============================================================================
// Teardown
// ============================================================================

/// What it takes to release a seat.
struct Teardown {
    leave: LeaveRoom,
    hub: Arc<dyn Hub>,
    bus: Arc<dyn Bus>,
    cmd: RoomCommand,
}

impl Teardown {
    async fn run(self) {
        self.bus.close().await;

        // Leave with a fresh token so server shutdown cannot skip it.
        if let Err(e) = self.leave.execute(&CancellationToken::new(), self.cmd.clone()).await {
            warn!(error = %e, code = e.error_code(), "Failed to leave room");
            self.hub.remove_bus(&self.cmd.client_id).await;
        }
    }
}

/// Runs the teardown exactly once. If the session future is dropped or
/// unwinds before [`LeaveGuard::run`], the teardown is spawned instead.
struct LeaveGuard(Option<Teardown>);

impl LeaveGuard {
    fn new(teardown: Teardown) -> Self {
        Self(Some(teardown))
    }

    async fn run(mut self) {
        if let Some(teardown) = self.0.take() {
            teardown.run().await;
        }
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        let Some(teardown) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(teardown.run().instrument(Span::current()));
            }
            Err(_) => warn!(
                client_id = %teardown.cmd.client_id,
                "No runtime available, client left without cleanup"
            ),
        }
    }
}
