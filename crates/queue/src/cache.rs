//! Advisory status cache.
//!
//! Fast-read projection of job status, keyed by job id. Writes are
//! best-effort and last-write-wins; the job store stays authoritative and
//! every reader falls back to it on a miss.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use imgconv_core::types::JobId;
use imgconv_core::StatusSnapshot;

use crate::error::QueueResult;

/// Cache key for a job's status snapshot.
pub fn job_status_key(job_id: JobId) -> String {
    format!("job_status:{job_id}")
}

/// Fast-path status reads and writes.
#[async_trait]
pub trait StatusCache: Send + Sync {
    /// Store a snapshot under `key`, replacing any previous value.
    async fn set(&self, key: &str, snapshot: &StatusSnapshot) -> QueueResult<()>;

    /// Fetch the snapshot under `key`, or `None` when absent.
    ///
    /// A present-but-undecodable value is an error, not a pass-through;
    /// callers treat it like a miss and fall back to the store.
    async fn get(&self, key: &str) -> QueueResult<Option<StatusSnapshot>>;
}

/// Redis-backed cache storing snapshots as JSON strings.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl StatusCache for RedisCache {
    async fn set(&self, key: &str, snapshot: &StatusSnapshot) -> QueueResult<()> {
        let payload = serde_json::to_string(snapshot)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, payload).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> QueueResult<Option<StatusSnapshot>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
