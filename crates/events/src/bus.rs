//! In-process event bus.
//!
//! Implements both event seams over a single `tokio::sync::broadcast`
//! channel, so single-process deployments and tests run without redis.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::EventResult;
use crate::event::StatusEvent;
use crate::publisher::EventPublisher;
use crate::subscriber::{EventSubscriber, Subscription};

const BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(String, StatusEvent)>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, channel: &str, event: &StatusEvent) -> EventResult<()> {
        // A send error only means no subscribers; fire-and-forget.
        let _ = self.tx.send((channel.to_string(), event.clone()));
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for EventBus {
    async fn subscribe(&self, channel: &str) -> EventResult<Subscription> {
        let mut bus_rx = self.tx.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = channel.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = bus_rx.recv() => {
                        match received {
                            Ok((event_channel, event)) if event_channel == channel => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(%channel, skipped, "Event subscriber lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });

        Ok(Subscription::new(rx))
    }
}
