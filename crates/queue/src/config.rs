/// Redelivery policy surfaced by the broker.
///
/// The worker never decides whether to retry — it rejects a failed
/// delivery and this policy takes over.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Deliveries after which a task is dead-lettered instead of re-queued.
    pub max_delivery_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 3,
        }
    }
}

/// Broker and cache connection configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL, shared by broker, cache, and pub/sub.
    pub redis_url: String,
    /// Base key of the ready list; processing and dead-letter lists are
    /// derived from it.
    pub queue_key: String,
    /// How long a `consume` call blocks before yielding `None`.
    pub poll_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `REDIS_URL`                | `redis://127.0.0.1:6379` |
    /// | `QUEUE_KEY`                | `convert_queue`          |
    /// | `BROKER_POLL_TIMEOUT_SECS` | `5`                      |
    /// | `MAX_DELIVERY_ATTEMPTS`    | `3`                      |
    pub fn from_env() -> Self {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());

        let queue_key = std::env::var("QUEUE_KEY").unwrap_or_else(|_| "convert_queue".into());

        let poll_timeout_secs: u64 = std::env::var("BROKER_POLL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("BROKER_POLL_TIMEOUT_SECS must be a valid u64");

        let max_delivery_attempts: u32 = std::env::var("MAX_DELIVERY_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("MAX_DELIVERY_ATTEMPTS must be a valid u32");

        Self {
            redis_url,
            queue_key,
            poll_timeout_secs,
            retry: RetryPolicy {
                max_delivery_attempts,
            },
        }
    }

    /// Key of the per-consumer in-flight list.
    pub fn processing_key(&self) -> String {
        format!("{}:processing", self.queue_key)
    }

    /// Key of the dead-letter list.
    pub fn dead_letter_key(&self) -> String {
        format!("{}:dead", self.queue_key)
    }
}
