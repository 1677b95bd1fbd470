//! Shared domain types for the image conversion pipeline.
//!
//! Everything that more than one crate needs lives here: the job status
//! state enum, the status snapshot exchanged between the store, the cache
//! and the HTTP surface, format allow-list helpers, the conversion codec,
//! and the file-handling configuration.

pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod snapshot;
pub mod status;
pub mod types;

pub use config::ConversionConfig;
pub use error::CoreError;
pub use snapshot::StatusSnapshot;
pub use status::ConversionStatus;
