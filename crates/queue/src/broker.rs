//! At-least-once task broker.
//!
//! [`RedisBroker`] keeps three lists:
//!
//! - `{queue}` — ready tasks, producers LPUSH;
//! - `{queue}:processing` — in-flight tasks, populated atomically by
//!   `BRPOPLPUSH` so each delivery attempt reaches exactly one consumer;
//! - `{queue}:dead` — tasks that exhausted the retry policy.
//!
//! `ack` removes the in-flight entry; `reject` removes it and either
//! re-queues the task with an incremented attempt count or dead-letters
//! it. Tasks stranded in the processing list by a crashed worker are moved
//! back to ready by [`RedisBroker::recover`] at startup, which is where
//! the at-least-once (rather than exactly-once) semantics come from.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::{QueueConfig, RetryPolicy};
use crate::error::QueueResult;
use crate::task::ConvertTask;

/// One delivery attempt of a task.
///
/// The receipt identifies the in-flight entry for `ack`/`reject`; for the
/// redis broker it is the raw serialized payload (the `LREM` argument).
#[derive(Debug, Clone)]
pub struct Delivery {
    pub task: ConvertTask,
    pub receipt: String,
}

/// Message-queue seam between ingress and the worker pool.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Put a task on the ready queue.
    async fn enqueue(&self, task: &ConvertTask) -> QueueResult<()>;

    /// Block up to the configured poll timeout for the next task.
    ///
    /// `None` means the timeout elapsed with nothing to do; callers loop.
    async fn consume(&self) -> QueueResult<Option<Delivery>>;

    /// Acknowledge a delivery as fully handled.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Report a delivery as failed so the retry policy can engage.
    async fn reject(&self, delivery: &Delivery) -> QueueResult<()>;
}

/// Redis-list broker implementation.
pub struct RedisBroker {
    conn: ConnectionManager,
    queue_key: String,
    processing_key: String,
    dead_letter_key: String,
    poll_timeout_secs: u64,
    retry: RetryPolicy,
}

impl RedisBroker {
    pub fn new(conn: ConnectionManager, config: &QueueConfig) -> Self {
        Self {
            conn,
            queue_key: config.queue_key.clone(),
            processing_key: config.processing_key(),
            dead_letter_key: config.dead_letter_key(),
            poll_timeout_secs: config.poll_timeout_secs,
            retry: config.retry,
        }
    }

    /// Move any tasks stranded in the processing list back to ready.
    ///
    /// Called once at worker startup; tasks re-delivered this way hit the
    /// worker's idempotency guard if they had already reached a terminal
    /// state.
    pub async fn recover(&self) -> QueueResult<usize> {
        let mut conn = self.conn.clone();
        let mut moved = 0usize;
        loop {
            let payload: Option<String> = conn
                .rpoplpush(&self.processing_key, &self.queue_key)
                .await?;
            if payload.is_none() {
                break;
            }
            moved += 1;
        }
        if moved > 0 {
            tracing::info!(moved, queue = %self.queue_key, "Recovered stranded in-flight tasks");
        }
        Ok(moved)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, task: &ConvertTask) -> QueueResult<()> {
        let payload = serde_json::to_string(task)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(&self.queue_key, payload).await?;
        Ok(())
    }

    async fn consume(&self) -> QueueResult<Option<Delivery>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .brpoplpush(
                &self.queue_key,
                &self.processing_key,
                self.poll_timeout_secs as f64,
            )
            .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let task: ConvertTask = serde_json::from_str(&payload)?;
        Ok(Some(Delivery {
            task,
            receipt: payload,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(&self.processing_key, 1, &delivery.receipt).await?;
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(&self.processing_key, 1, &delivery.receipt).await?;

        let mut task = delivery.task.clone();
        task.attempts += 1;
        let payload = serde_json::to_string(&task)?;

        if task.attempts >= self.retry.max_delivery_attempts {
            tracing::warn!(
                job_id = %task.job_id,
                attempts = task.attempts,
                "Task exhausted delivery attempts, dead-lettering"
            );
            let _: () = conn.lpush(&self.dead_letter_key, payload).await?;
        } else {
            let _: () = conn.lpush(&self.queue_key, payload).await?;
        }
        Ok(())
    }
}
