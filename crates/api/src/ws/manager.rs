use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Manages all active WebSocket sessions.
///
/// Each connection is keyed by the session id minted at upgrade time.
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    sessions: RwLock<HashMap<String, WsSender>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, session_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().await.insert(session_id, tx);
        rx
    }

    /// Remove a session by its id.
    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Send a message to one session.
    ///
    /// Returns `false` when the session is unknown or its channel is
    /// closed (the connection cleans itself up on its next loop turn).
    pub async fn send_to_session(&self, session_id: &str, message: Message) -> bool {
        match self.sessions.read().await.get(session_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Return the current number of active sessions.
    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Send a Close frame to every session, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        for sender in sessions.values() {
            let _ = sender.send(Message::Close(None));
        }
        sessions.clear();
        tracing::info!(count, "Closed all WebSocket sessions");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
