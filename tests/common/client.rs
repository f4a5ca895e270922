//! Test WebSocket client.
//!
//! Joins a room, sends inbound frames and asserts on received
//! `room-state` snapshots.

use futures_util::{SinkExt, StreamExt};
use poker_proto::{OutboundMessage, RoomState};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A joined participant.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    client_id: String,
    room_id: String,
}

impl TestClient {
    /// Open a session and wait for the assigned client id.
    pub async fn connect(address: &str, room_id: &str) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(format!("ws://{address}/{room_id}/ws")).await?;
        let mut client = Self {
            ws,
            client_id: String::new(),
            room_id: room_id.to_string(),
        };
        match client.recv().await? {
            OutboundMessage::UpdateClientId { client_id } => client.client_id = client_id,
            other => anyhow::bail!("expected update-client-id first, got {other:?}"),
        }
        Ok(client)
    }

    pub fn id(&self) -> &str {
        &self.client_id
    }

    /// Send a frame of type `kind` with extra `fields`. Room and client ids
    /// are filled in the way browsers send them.
    pub async fn send(&mut self, kind: &str, fields: Value) -> anyhow::Result<()> {
        let mut frame = json!({
            "type": kind,
            "roomId": self.room_id,
            "clientId": self.client_id,
        });
        if let (Some(frame), Some(fields)) = (frame.as_object_mut(), fields.as_object()) {
            for (key, value) in fields {
                frame.insert(key.clone(), value.clone());
            }
        }
        self.send_raw(&frame.to_string()).await
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn vote(&mut self, vote: &str) -> anyhow::Result<()> {
        self.send("vote", json!({ "vote": vote })).await
    }

    /// Receive the next server message, skipping control frames.
    pub async fn recv(&mut self) -> anyhow::Result<OutboundMessage> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<OutboundMessage> {
        loop {
            let frame = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed by server"),
                _ => continue,
            }
        }
    }

    /// Receive snapshots until one satisfies `predicate`.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<RoomState>
    where
        F: FnMut(&RoomState) -> bool,
    {
        loop {
            if let OutboundMessage::RoomState(state) = self.recv().await? {
                if predicate(&state) {
                    return Ok(state);
                }
            }
        }
    }

    /// Assert that nothing arrives for `dur`.
    #[allow(dead_code)]
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Err(e) if e.is::<tokio::time::error::Elapsed>() => Ok(()),
            Err(e) => Err(e),
            Ok(message) => anyhow::bail!("expected silence, got {message:?}"),
        }
    }

    /// Close the connection with a close frame.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
