#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EventResult<T> = Result<T, EventError>;
