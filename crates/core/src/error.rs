use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: JobId },

    #[error("Unsupported format: {0}")]
    InvalidFormat(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Unknown status value: {0}")]
    InvalidStatus(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
