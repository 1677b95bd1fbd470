//! Publish side of the status event fan-out.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::EventResult;
use crate::event::StatusEvent;

/// Sink for status events.
///
/// Publishing is fire-and-forget: an event with no current subscriber is
/// dropped, and delivery failures never roll back the store transition
/// that produced the event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, event: &StatusEvent) -> EventResult<()>;
}

/// Redis pub/sub publisher, for cross-process delivery from the worker to
/// the API relay.
pub struct RedisEventPublisher {
    conn: ConnectionManager,
}

impl RedisEventPublisher {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, channel: &str, event: &StatusEvent) -> EventResult<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        // The reply is the number of receivers; zero is fine.
        let _: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }
}
