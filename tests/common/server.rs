//! Test server management.
//!
//! Runs a hub inside the test process. Each server gets its own listener on
//! an ephemeral port; servers built from the same Redis URL share rooms.

use poker_hub::config::Config;
use poker_hub::metrics::NoopMetrics;
use poker_hub::network::{AppState, Gateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Base configuration: loopback listener, no metrics listener, memory store.
const BASE_CONFIG: &str = r#"
[server]
listen = "127.0.0.1:0"
metrics_port = 0
"#;

/// Parse `BASE_CONFIG` followed by `extra` TOML sections.
pub fn test_config(extra: &str) -> Config {
    Config::parse(&format!("{BASE_CONFIG}\n{extra}")).expect("test config must parse")
}

/// A hub instance.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(test_config("")).await
    }

    /// Spawn a server with the given configuration.
    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let shutdown = CancellationToken::new();
        let state = AppState::build(&config, Arc::new(NoopMetrics), shutdown.clone()).await?;
        let gateway = Gateway::bind(config.server.listen, state).await?;
        let addr = gateway.local_addr()?;
        let task = tokio::spawn(gateway.run());
        Ok(Self {
            addr,
            shutdown,
            task: Some(task),
        })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Create a room over HTTP and return its id.
    pub async fn create_room(&self) -> anyhow::Result<String> {
        let response = super::http::request(
            &self.address(),
            "POST",
            "/room",
            &[("Content-Type", "application/json")],
            r#"{"createdBy":"tester"}"#,
        )
        .await?;
        anyhow::ensure!(response.status == 201, "unexpected status {}", response.status);
        let body: serde_json::Value = serde_json::from_str(&response.body)?;
        body["roomId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no roomId in {}", response.body))
    }

    /// Join `room_id` with a new WebSocket client.
    pub async fn join(&self, room_id: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), room_id).await
    }

    /// Stop the server and wait for it to finish shutting down.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
