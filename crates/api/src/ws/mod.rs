//! WebSocket notification relay.
//!
//! Provides connection management keyed by session id and the HTTP
//! upgrade handler that subscribes each session to its status channel.

mod handler;
pub mod manager;

pub use handler::ws_handler;
pub use manager::WsManager;
