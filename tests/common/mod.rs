//! Integration test common infrastructure.
//!
//! Provides an in-process hub on an ephemeral port, a WebSocket test
//! client and a minimal HTTP helper for the REST routes.

pub mod client;
pub mod http;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
