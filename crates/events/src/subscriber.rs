//! Subscribe side of the status event fan-out.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::EventResult;
use crate::event::StatusEvent;

/// Stream of events for one channel.
///
/// Dropping the subscription tears down the underlying listener; for the
/// redis implementation that also unsubscribes the pub/sub connection.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<StatusEvent>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<StatusEvent>) -> Self {
        Self { rx }
    }

    /// Next event on the channel, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<StatusEvent> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(&self, channel: &str) -> EventResult<Subscription>;
}

/// Redis pub/sub subscriber. Each subscription opens its own pub/sub
/// connection so channels tear down independently.
pub struct RedisEventSubscriber {
    client: redis::Client,
}

impl RedisEventSubscriber {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventSubscriber for RedisEventSubscriber {
    async fn subscribe(&self, channel: &str) -> EventResult<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let channel = channel.to_string();

        tokio::spawn(async move {
            {
                let mut stream = pubsub.on_message();
                loop {
                    tokio::select! {
                        message = stream.next() => {
                            let Some(message) = message else { break };
                            let payload: String = match message.get_payload() {
                                Ok(payload) => payload,
                                Err(error) => {
                                    tracing::warn!(%channel, %error, "Unreadable pub/sub payload");
                                    continue;
                                }
                            };
                            match serde_json::from_str::<StatusEvent>(&payload) {
                                Ok(event) => {
                                    if tx.send(event).is_err() {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    tracing::warn!(%channel, %error, "Malformed status event");
                                }
                            }
                        }
                        _ = tx.closed() => break,
                    }
                }
            }
            if let Err(error) = pubsub.unsubscribe(&channel).await {
                tracing::debug!(%channel, %error, "Pub/sub unsubscribe failed");
            }
        });

        Ok(Subscription::new(rx))
    }
}
