//! Fixtures for use case tests: a memory-backed hub and counting metrics.

use super::{Deps, JoinRoomCommand, Joined, UseCase, UseCases};
use crate::hub::testing::RecordingBus;
use crate::hub::{Bus, Hub, StoreHub};
use crate::lock::{LockManager, LockSettings, StoreLockManager};
use crate::metrics::Metrics;
use crate::store::{MemoryStore, keys};
use poker_proto::{OutboundMessage, RoomState};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Span;

#[derive(Default)]
pub(crate) struct CountingMetrics {
    pub(crate) active_users: AtomicI64,
    pub(crate) users_total: AtomicI64,
    pub(crate) active_rooms: AtomicI64,
}

impl Metrics for CountingMetrics {
    fn user_joined(&self) {
        self.active_users.fetch_add(1, Ordering::SeqCst);
        self.users_total.fetch_add(1, Ordering::SeqCst);
    }

    fn user_left(&self) {
        self.active_users.fetch_sub(1, Ordering::SeqCst);
    }

    fn room_opened(&self) {
        self.active_rooms.fetch_add(1, Ordering::SeqCst);
    }

    fn room_closed(&self) {
        self.active_rooms.fetch_sub(1, Ordering::SeqCst);
    }

    fn lock_waited(&self, _wait: Duration) {}
}

pub(crate) struct Fixture {
    pub(crate) hub: Arc<StoreHub>,
    pub(crate) metrics: Arc<CountingMetrics>,
    pub(crate) use_cases: UseCases,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with_locks(LockSettings {
        retry_delay: Duration::from_millis(2),
        max_retries: 2_000,
        ..LockSettings::default()
    })
}

pub(crate) fn fixture_with_locks(settings: LockSettings) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(StoreHub::new(store.clone(), keys::DEFAULT_TTL, Span::none()));
    let locks: Arc<dyn LockManager> = Arc::new(StoreLockManager::new(store, settings));
    let metrics = Arc::new(CountingMetrics::default());
    let use_cases = UseCases::new(Deps {
        hub: hub.clone() as Arc<dyn Hub>,
        locks,
        metrics: metrics.clone() as Arc<dyn Metrics>,
        span: Span::none(),
    });
    Fixture {
        hub,
        metrics,
        use_cases,
    }
}

/// Decode the last `room-state` a bus received.
pub(crate) fn last_state(sent: &[String]) -> Option<RoomState> {
    sent.iter().rev().find_map(|text| {
        match serde_json::from_str::<OutboundMessage>(text).ok()? {
            OutboundMessage::RoomState(state) => Some(state),
            _ => None,
        }
    })
}

/// Poll until `check` holds.
pub(crate) async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Join `room_id` through the use case and hand back the recording bus.
pub(crate) async fn join(use_cases: &UseCases, room_id: &str) -> (Joined, Arc<RecordingBus>) {
    let slot = Arc::new(parking_lot::Mutex::new(None));
    let captured = Arc::clone(&slot);
    let room = room_id.to_string();
    let joined = use_cases
        .join_room
        .execute(
            &CancellationToken::new(),
            JoinRoomCommand {
                room_id: room_id.to_string(),
                bus_factory: Box::new(move |client_id: &str| {
                    let bus = RecordingBus::new(client_id, &room);
                    *captured.lock() = Some(Arc::clone(&bus));
                    bus as Arc<dyn Bus>
                }),
            },
        )
        .await
        .unwrap();
    let bus = slot.lock().take().unwrap();
    (joined, bus)
}
