//! WebSocket-backed [`Bus`]: the write half of one browser connection.

use crate::hub::{Bus, BusError};
use async_trait::async_trait;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Writes room updates and pings to a single connection.
///
/// Every write is bounded by the write timeout so a stalled client only
/// loses its own update; the forwarding task moves on to the next bus.
pub struct WsBus<S> {
    client_id: String,
    room_id: String,
    sink: Mutex<S>,
    write_timeout: Duration,
    closed: AtomicBool,
}

impl<S> WsBus<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(client_id: &str, room_id: &str, sink: S, write_timeout: Duration) -> Self {
        Self {
            client_id: client_id.to_string(),
            room_id: room_id.to_string(),
            sink: Mutex::new(sink),
            write_timeout,
            closed: AtomicBool::new(false),
        }
    }

    async fn write(&self, message: Message) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BusError::Transport(e.to_string())),
            Err(_) => Err(BusError::Timeout(self.write_timeout)),
        }
    }
}

#[async_trait]
impl<S> Bus for WsBus<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn room_id(&self) -> &str {
        &self.room_id
    }

    async fn send(&self, payload: &str) -> Result<(), BusError> {
        self.write(Message::Text(payload.to_string())).await
    }

    async fn ping(&self) -> Result<(), BusError> {
        self.write(Message::Ping(Vec::new())).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sink = self.sink.lock().await;
        let farewell = async {
            sink.send(Message::Close(None)).await?;
            sink.close().await
        };
        match tokio::time::timeout(self.write_timeout, farewell).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(client_id = %self.client_id, error = %e, "Close frame not delivered")
            }
            Err(_) => debug!(client_id = %self.client_id, "Timed out closing connection"),
        }
    }
}
