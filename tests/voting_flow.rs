//! End-to-end voting rounds over real WebSocket sessions.

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn two_voters_reveal_and_spectator_is_excluded() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let room = server.create_room().await?;

    let mut alice = server.join(&room).await?;
    let mut bob = server.join(&room).await?;
    let mut carol = server.join(&room).await?;
    let carol_id = carol.id().to_string();
    alice.recv_until(|s| s.participants.len() == 3).await?;

    alice
        .send("toggle-spectator", json!({ "targetClientId": carol_id }))
        .await?;
    alice
        .recv_until(|s| s.participants.iter().any(|p| p.id == carol_id && p.is_spectator))
        .await?;

    // The spectator's vote is recorded but never counted.
    carol.vote("10").await?;
    carol.send("update-name", json!({ "username": "Carol" })).await?;
    let state = alice
        .recv_until(|s| {
            s.participants
                .iter()
                .any(|p| p.id == carol_id && p.has_voted && p.name == "Carol")
        })
        .await?;
    assert!(!state.reveal);

    alice.vote("5").await?;
    bob.vote("8").await?;

    for client in [&mut alice, &mut bob, &mut carol] {
        let state = client.recv_until(|s| s.reveal).await?;
        assert_eq!(state.result, Some(6.5));
        assert_eq!(state.most_appearing_votes, vec![5.0, 8.0]);
    }

    server.stop().await
}

#[tokio::test]
async fn vote_again_keeps_story_and_clears_votes() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let room = server.create_room().await?;
    let mut owner = server.join(&room).await?;

    owner.send("update-story", json!({ "story": "PROJ-7 search" })).await?;
    owner.vote("3").await?;
    owner.recv_until(|s| s.reveal && s.result == Some(3.0)).await?;

    owner.send("vote-again", json!({})).await?;
    let state = owner.recv_until(|s| !s.reveal).await?;
    assert_eq!(state.current_story, "PROJ-7 search");
    assert_eq!(state.result, None);
    assert!(state.participants.iter().all(|p| !p.has_voted));

    owner.vote("2").await?;
    owner.recv_until(|s| s.reveal).await?;
    owner.send("new-voting", json!({})).await?;
    let state = owner.recv_until(|s| !s.reveal).await?;
    assert_eq!(state.current_story, "");

    server.stop().await
}

#[tokio::test]
async fn non_numeric_votes_do_not_count() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let room = server.create_room().await?;
    let mut alice = server.join(&room).await?;
    let mut bob = server.join(&room).await?;

    alice.vote("?").await?;
    bob.vote("coffee").await?;
    let state = alice.recv_until(|s| s.reveal).await?;
    assert_eq!(state.result, None);
    assert!(state.most_appearing_votes.is_empty());

    server.stop().await
}

#[tokio::test]
async fn empty_vote_withdraws() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let room = server.create_room().await?;
    let mut alice = server.join(&room).await?;
    let mut bob = server.join(&room).await?;
    let alice_id = alice.id().to_string();

    alice.vote("8").await?;
    bob.recv_until(|s| s.participants.iter().any(|p| p.id == alice_id && p.has_voted))
        .await?;

    alice.vote("").await?;
    let state = bob
        .recv_until(|s| s.participants.iter().any(|p| p.id == alice_id && !p.has_voted))
        .await?;
    assert!(!state.reveal);

    server.stop().await
}
