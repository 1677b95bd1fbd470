//! In-memory broker, cache, and rate-limit store.
//!
//! Single-process stand-ins with the same contracts as the redis
//! implementations. They back the test suites and make the pipeline
//! runnable without external services.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

use imgconv_core::StatusSnapshot;

use crate::broker::{Broker, Delivery};
use crate::cache::StatusCache;
use crate::config::RetryPolicy;
use crate::error::QueueResult;
use crate::rate_limit::RateLimitStore;
use crate::task::ConvertTask;

// ---------------------------------------------------------------------------
// MemoryBroker
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BrokerState {
    ready: VecDeque<ConvertTask>,
    in_flight: HashMap<String, ConvertTask>,
    dead: Vec<ConvertTask>,
}

/// In-process broker with the same ready/in-flight/dead-letter shape as
/// [`RedisBroker`](crate::broker::RedisBroker).
pub struct MemoryBroker {
    state: Mutex<BrokerState>,
    notify: Notify,
    retry: RetryPolicy,
    poll_timeout: Duration,
}

impl MemoryBroker {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            notify: Notify::new(),
            retry,
            poll_timeout: Duration::from_millis(100),
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Number of tasks waiting for delivery.
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Number of tasks currently delivered but not yet acked/rejected.
    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Dead-lettered tasks, oldest first.
    pub async fn dead_letters(&self) -> Vec<ConvertTask> {
        self.state.lock().await.dead.clone()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn enqueue(&self, task: &ConvertTask) -> QueueResult<()> {
        self.state.lock().await.ready.push_back(task.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn consume(&self) -> QueueResult<Option<Delivery>> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(task) = state.ready.pop_front() {
                    let receipt = Uuid::new_v4().to_string();
                    state.in_flight.insert(receipt.clone(), task.clone());
                    return Ok(Some(Delivery { task, receipt }));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        self.state.lock().await.in_flight.remove(&delivery.receipt);
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.in_flight.remove(&delivery.receipt);

        let mut task = delivery.task.clone();
        task.attempts += 1;
        if task.attempts >= self.retry.max_delivery_attempts {
            state.dead.push(task);
        } else {
            state.ready.push_back(task);
            self.notify.notify_one();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// In-process status cache. Last write wins, no TTL.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, StatusSnapshot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusCache for MemoryCache {
    async fn set(&self, key: &str, snapshot: &StatusSnapshot) -> QueueResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> QueueResult<Option<StatusSnapshot>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryRateLimitStore
// ---------------------------------------------------------------------------

/// In-process fixed-window counter.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, (Instant, u64)>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn incr_window(&self, key: &str, window_secs: u64) -> QueueResult<u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        Ok(entry.1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
