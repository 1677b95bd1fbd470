//! Broker and status cache for the conversion pipeline.
//!
//! - [`Broker`] — at-least-once task delivery, decoupling admission from
//!   execution. The redis implementation uses a ready list plus a
//!   per-consumer processing list (`BRPOPLPUSH`) so a task is delivered to
//!   at most one worker per attempt, and a crashed worker's in-flight
//!   tasks can be recovered.
//! - [`StatusCache`] — advisory fast-read projection of job status. The
//!   job store stays authoritative; cache writes are best-effort.
//! - [`RateLimitStore`] — fixed-window request counter used by the HTTP
//!   rate-limit middleware.
//!
//! In-memory implementations of all three back the test suites and
//! single-process setups.

pub mod broker;
pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod rate_limit;
pub mod task;

pub use broker::{Broker, Delivery, RedisBroker};
pub use cache::{job_status_key, RedisCache, StatusCache};
pub use config::{QueueConfig, RetryPolicy};
pub use error::{QueueError, QueueResult};
pub use memory::{MemoryBroker, MemoryCache, MemoryRateLimitStore};
pub use rate_limit::{RateLimitStore, RedisRateLimitStore};
pub use task::ConvertTask;
