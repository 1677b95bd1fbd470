//! Unit tests for `WsManager`.
//!
//! These tests exercise the session manager directly, without performing
//! any HTTP upgrades. They verify add/remove semantics, targeted sends,
//! and graceful shutdown behaviour.

use axum::extract::ws::Message;
use imgconv_api::ws::WsManager;

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_increments_connection_count() {
    let manager = WsManager::new();

    let _rx = manager.add("sess-1".to_string()).await;

    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn remove_decrements_connection_count() {
    let manager = WsManager::new();

    let _rx = manager.add("sess-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("sess-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn remove_unknown_id_is_noop() {
    let manager = WsManager::new();

    let _rx = manager.add("sess-1".to_string()).await;
    manager.remove("nonexistent").await;

    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn send_to_session_reaches_only_that_session() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("sess-1".to_string()).await;
    let mut rx2 = manager.add("sess-2".to_string()).await;

    let sent = manager
        .send_to_session("sess-1", Message::Text("hello".into()))
        .await;
    assert!(sent);

    let received = rx1.recv().await.unwrap();
    assert_eq!(received, Message::Text("hello".into()));
    assert!(rx2.try_recv().is_err());
}

#[tokio::test]
async fn send_to_unknown_session_returns_false() {
    let manager = WsManager::new();

    let sent = manager
        .send_to_session("ghost", Message::Text("hello".into()))
        .await;
    assert!(!sent);
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("sess-1".to_string()).await;
    let mut rx2 = manager.add("sess-2".to_string()).await;
    assert_eq!(manager.connection_count().await, 2);

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(rx1.recv().await.unwrap(), Message::Close(None));
    assert_eq!(rx2.recv().await.unwrap(), Message::Close(None));
}
