//! In-memory bus for exercising the hub and use cases without sockets.

use super::{Bus, BusError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub(crate) struct RecordingBus {
    client_id: String,
    room_id: String,
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
    closed: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingBus {
    pub(crate) fn new(client_id: &str, room_id: &str) -> Arc<Self> {
        Arc::new(Self {
            client_id: client_id.to_string(),
            room_id: room_id.to_string(),
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Make every send take `delay`, like a client on a congested link.
    pub(crate) fn delay_sends(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bus for RecordingBus {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn room_id(&self) -> &str {
        &self.room_id
    }

    async fn send(&self, payload: &str) -> Result<(), BusError> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BusError::Transport("simulated failure".into()));
        }
        self.sent.lock().push(payload.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
