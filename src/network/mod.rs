//! Network module.
//!
//! Contains the Gateway (HTTP listener and routes), the per-connection
//! Session and the WebSocket-backed bus.

mod bus;
mod gateway;
mod session;

pub use bus::WsBus;
pub use gateway::{AppState, Gateway, router};
pub use session::{Session, SessionSettings};
