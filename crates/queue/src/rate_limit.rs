//! Fixed-window request counter backing the HTTP rate-limit middleware.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::QueueResult;

/// Counter storage for fixed-window rate limiting.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Increment the counter for `key`, starting a fresh window of
    /// `window_secs` on first increment. Returns the count within the
    /// current window, including this request.
    async fn incr_window(&self, key: &str, window_secs: u64) -> QueueResult<u64>;
}

/// Redis INCR/EXPIRE implementation.
pub struct RedisRateLimitStore {
    conn: ConnectionManager,
}

impl RedisRateLimitStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn incr_window(&self, key: &str, window_secs: u64) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_secs as i64).await?;
        }
        Ok(count)
    }
}
