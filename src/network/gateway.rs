//! Gateway - the HTTP listener that creates rooms and upgrades sessions.
//!
//! Routes:
//! - `POST /room` creates a room
//! - `GET /room/{id}` checks that a room exists
//! - `GET /{roomId}/ws` upgrades to a session
//! - `GET /admin/rooms` lists rooms (bearer token)
//! - `GET /health` reports store reachability

use super::session::{Session, SessionSettings};
use crate::config::{Config, LockBackend, StoreBackend};
use crate::error::{RoomError, UseCaseError};
use crate::hub::{Hub, HubError, StoreHub};
use crate::lock::{LocalLockManager, LockError, LockManager, LockSettings, StoreLockManager};
use crate::metrics::Metrics;
use crate::store::{MemoryStore, RedisStore, SharedStore, StoreError};
use crate::telemetry::spans;
use crate::usecase::{CreateRoomCommand, Deps, UseCase, UseCases};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderMap, StatusCode, header};
use poker_proto::{HandshakeResult, OriginPolicy};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument, warn};

/// Store round trips slower than this are reported as degraded.
const HEALTH_WARN_LATENCY: Duration = Duration::from_millis(100);

/// How long shutdown waits for sessions to leave their rooms.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub use_cases: UseCases,
    pub hub: Arc<dyn Hub>,
    pub store: Arc<dyn SharedStore>,
    pub origins: Arc<OriginPolicy>,
    pub admin_key: Option<Arc<str>>,
    pub session: SessionSettings,
    pub sessions: TaskTracker,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the store, hub, locks and use cases selected by `config`.
    pub async fn build(
        config: &Config,
        metrics: Arc<dyn Metrics>,
        shutdown: CancellationToken,
    ) -> Result<Self, StoreError> {
        let store: Arc<dyn SharedStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redis => {
                let url = config.store.redis_url.as_deref().ok_or_else(|| {
                    StoreError::Unavailable("store.redis_url is not set".to_string())
                })?;
                Arc::new(RedisStore::connect(url).await?)
            }
        };
        let hub: Arc<dyn Hub> = Arc::new(StoreHub::new(
            Arc::clone(&store),
            config.store.room_ttl(),
            spans::hub(store.backend()),
        ));
        let locks: Arc<dyn LockManager> = match config.lock.backend {
            LockBackend::Local => Arc::new(LocalLockManager::new()),
            LockBackend::Store => Arc::new(StoreLockManager::new(
                Arc::clone(&store),
                LockSettings {
                    lease_timeout: Duration::from_millis(config.lock.timeout_ms),
                    retry_delay: Duration::from_millis(config.lock.retry_delay_ms),
                    max_retries: config.lock.max_retries,
                },
            )),
        };
        info!(
            store = store.backend(),
            lock = ?config.lock.backend,
            "Room services ready"
        );

        let use_cases = UseCases::new(Deps {
            hub: Arc::clone(&hub),
            locks,
            metrics,
            span: spans::use_cases(),
        });

        Ok(Self {
            use_cases,
            hub,
            store,
            origins: Arc::new(OriginPolicy::new(config.websocket.allowed_origins.clone())),
            admin_key: config.admin.api_key.as_deref().map(Arc::from),
            session: SessionSettings {
                ping_interval: config.websocket.ping_interval(),
                read_timeout: config.websocket.read_timeout(),
                write_timeout: config.websocket.write_timeout(),
            },
            sessions: TaskTracker::new(),
            shutdown,
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/room", post(create_room))
        .route("/room/:room_id", get(get_room))
        .route("/:room_id/ws", get(open_session))
        .route("/admin/rooms", get(list_rooms))
        .route("/health", get(health))
        .with_state(state)
}

/// The Gateway owns the listener and serves until shutdown.
pub struct Gateway {
    listener: TcpListener,
    state: AppState,
}

impl Gateway {
    pub async fn bind(addr: SocketAddr, state: AppState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the shutdown token fires, then let sessions leave their
    /// rooms and stop the hub.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let Self { listener, state } = self;
        let shutdown = state.shutdown.clone();
        let sessions = state.sessions.clone();
        let hub = Arc::clone(&state.hub);

        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        sessions.close();
        if tokio::time::timeout(SESSION_DRAIN_TIMEOUT, sessions.wait())
            .await
            .is_err()
        {
            warn!(remaining = sessions.len(), "Sessions still open at shutdown");
        }
        hub.shutdown().await;
        info!("Gateway stopped");
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A JSON error body: `{"msg": ...}`.
struct ApiError {
    status: StatusCode,
    msg: String,
}

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "msg": self.msg }))).into_response()
    }
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        let status = match &e {
            UseCaseError::RoomNotFound(_)
            | UseCaseError::Room(RoomError::ClientNotFound(_))
            | UseCaseError::Room(RoomError::TargetNotFound(_)) => StatusCode::NOT_FOUND,
            UseCaseError::Room(RoomError::NotAuthorized { .. }) => StatusCode::FORBIDDEN,
            UseCaseError::Lock(LockError::AcquisitionFailed { .. })
            | UseCaseError::Lock(LockError::Store(_))
            | UseCaseError::Hub(HubError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %e, code = e.error_code(), "Request failed");
        }
        Self::new(status, e.to_string())
    }
}

// ============================================================================
// Rooms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    #[serde(default)]
    created_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomCreated {
    room_id: String,
}

async fn create_room(
    State(state): State<AppState>,
    body: Option<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<RoomCreated>), ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let created_by = request
        .created_by
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "anonymous".to_string());

    let room = state
        .use_cases
        .create_room
        .execute(&state.shutdown, CreateRoomCommand { created_by })
        .await?;
    info!(room_id = %room.id(), owner = %room.owner(), "Room created");
    Ok((
        StatusCode::CREATED,
        Json(RoomCreated {
            room_id: room.id().to_string(),
        }),
    ))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomCreated>, ApiError> {
    match state.hub.get_room(&room_id).await {
        Some(room) => Ok(Json(RoomCreated {
            room_id: room.id().to_string(),
        })),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "room not found")),
    }
}

async fn open_session(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if let HandshakeResult::Reject { status, reason } = state.origins.validate(origin) {
        warn!(room_id = %room_id, %reason, "Rejected WebSocket upgrade");
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN);
        return ApiError::new(status, reason).into_response();
    }

    if state.hub.get_room(&room_id).await.is_none() {
        return ApiError::new(StatusCode::NOT_FOUND, "room not found").into_response();
    }

    let session = Session::new(
        room_id,
        state.use_cases.clone(),
        Arc::clone(&state.hub),
        state.session,
        state.shutdown.clone(),
    );
    let sessions = state.sessions.clone();
    ws.on_upgrade(move |socket| sessions.track_future(session.run(socket)))
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomSummary {
    id: String,
    clients: Vec<ClientSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientSummary {
    id: String,
    name: String,
    is_spectator: bool,
    is_owner: bool,
}

/// Whether the request carries the configured bearer token. Without a
/// configured key nobody is admitted.
fn authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return false;
    };
    expected.as_bytes().ct_eq(token.trim().as_bytes()).into()
}

async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    if !authorized(state.admin_key.as_deref(), &headers) {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized"));
    }

    let rooms = state
        .hub
        .get_rooms()
        .await
        .into_iter()
        .map(|room| RoomSummary {
            id: room.id().to_string(),
            clients: room
                .clients()
                .iter()
                .map(|c| ClientSummary {
                    id: c.id().to_string(),
                    name: c.name.clone(),
                    is_spectator: c.is_spectator,
                    is_owner: c.is_owner,
                })
                .collect(),
        })
        .collect();
    Ok(Json(rooms))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    status: CheckStatus,
    backend: &'static str,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Ping the store and classify the round trip.
async fn check_store(store: &dyn SharedStore) -> CheckReport {
    let started = Instant::now();
    let outcome = store.ping().await;
    let latency = started.elapsed();

    let (status, error) = match outcome {
        Err(e) => (CheckStatus::Fail, Some(e.to_string())),
        Ok(()) if latency > HEALTH_WARN_LATENCY => (CheckStatus::Warn, None),
        Ok(()) => (CheckStatus::Ok, None),
    };
    CheckReport {
        status,
        backend: store.backend(),
        latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        error,
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let store = check_store(state.store.as_ref()).await;
    let status = store.status;
    let code = if status == CheckStatus::Fail {
        warn!(error = ?store.error, "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let body = json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": { "store": store },
    });
    (code, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn admin_token_must_match() {
        assert!(authorized(Some("s3cret"), &bearer("s3cret")));
        assert!(!authorized(Some("s3cret"), &bearer("s3cre")));
        assert!(!authorized(Some("s3cret"), &HeaderMap::new()));
    }

    #[test]
    fn admin_is_closed_without_a_key() {
        assert!(!authorized(None, &bearer("anything")));
    }

    #[test]
    fn use_case_errors_map_to_statuses() {
        let not_found = ApiError::from(UseCaseError::RoomNotFound("r".into()));
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let forbidden = ApiError::from(UseCaseError::Room(RoomError::NotAuthorized {
            client_id: "c".into(),
            action: "reveal",
        }));
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let busy = ApiError::from(UseCaseError::Lock(LockError::AcquisitionFailed {
            key: "r".into(),
            attempts: 3,
        }));
        assert_eq!(busy.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn memory_store_is_healthy() {
        let report = check_store(&MemoryStore::new()).await;
        assert_eq!(report.status, CheckStatus::Ok);
        assert_eq!(report.backend, "memory");
        assert!(report.error.is_none());
    }
}
