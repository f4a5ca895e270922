//! REST routes, upgrade checks, admin access and health.

mod common;

use common::server::test_config;
use common::{TestServer, http};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

/// Status of a refused WebSocket upgrade.
fn refused_status(result: Result<impl Sized, WsError>) -> u16 {
    match result {
        Err(WsError::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("expected an HTTP refusal, got {e}"),
        Ok(_) => panic!("expected the upgrade to be refused"),
    }
}

#[tokio::test]
async fn create_and_look_up_rooms() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let addr = server.address();

    let room = server.create_room().await?;
    let found = http::get(&addr, &format!("/room/{room}")).await?;
    assert_eq!(found.status, 200);
    assert_eq!(found.json()["roomId"], room.as_str());

    let missing = http::get(&addr, "/room/does-not-exist").await?;
    assert_eq!(missing.status, 404);
    assert!(missing.json()["msg"].is_string());

    // The creator is optional.
    let bare = http::request(&addr, "POST", "/room", &[], "").await?;
    assert_eq!(bare.status, 201);
    assert!(bare.json()["roomId"].is_string());

    server.stop().await
}

#[tokio::test]
async fn upgrade_to_missing_room_is_refused() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let result = connect_async(format!("ws://{}/no-such-room/ws", server.address())).await;
    assert_eq!(refused_status(result), 404);
    server.stop().await
}

#[tokio::test]
async fn upgrade_checks_origin_allow_list() -> anyhow::Result<()> {
    let config = test_config(
        r#"
[websocket]
allowed_origins = ["https://poker.example"]
"#,
    );
    let server = TestServer::spawn_with(config).await?;
    let room = server.create_room().await?;
    let url = format!("ws://{}/{room}/ws", server.address());

    let mut evil = url.as_str().into_client_request()?;
    evil.headers_mut()
        .insert("Origin", "https://evil.example".parse()?);
    assert_eq!(refused_status(connect_async(evil).await), 403);

    let mut good = url.as_str().into_client_request()?;
    good.headers_mut()
        .insert("Origin", "https://poker.example/".parse()?);
    let (ws, _) = connect_async(good).await?;
    drop(ws);

    server.stop().await
}

#[tokio::test]
async fn admin_rooms_requires_configured_key() -> anyhow::Result<()> {
    let open = TestServer::spawn().await?;
    let response = http::request(
        &open.address(),
        "GET",
        "/admin/rooms",
        &[("Authorization", "Bearer anything")],
        "",
    )
    .await?;
    assert_eq!(response.status, 401);
    open.stop().await?;

    let server = TestServer::spawn_with(test_config(
        r#"
[admin]
api_key = "letmein"
"#,
    ))
    .await?;
    let addr = server.address();
    let room = server.create_room().await?;
    let client = server.join(&room).await?;

    let wrong = http::request(&addr, "GET", "/admin/rooms", &[("Authorization", "Bearer nope")], "")
        .await?;
    assert_eq!(wrong.status, 401);

    let listing =
        http::request(&addr, "GET", "/admin/rooms", &[("Authorization", "Bearer letmein")], "")
            .await?;
    assert_eq!(listing.status, 200);
    let rooms = listing.json();
    let entry = rooms
        .as_array()
        .and_then(|rooms| rooms.iter().find(|r| r["id"] == room.as_str()))
        .expect("room listed");
    assert_eq!(entry["clients"][0]["id"], client.id());
    assert_eq!(entry["clients"][0]["isOwner"], true);

    server.stop().await
}

#[tokio::test]
async fn health_reports_store() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let health = http::get(&server.address(), "/health").await?;
    assert_eq!(health.status, 200);

    let body = health.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["store"]["backend"], "memory");
    assert!(body["timestamp"].is_string());

    server.stop().await
}
