//! Status event fan-out for the conversion pipeline.
//!
//! - [`StatusEvent`] — the snapshot value published on every job status
//!   change; transient, no storage obligation.
//! - [`EventPublisher`] / [`EventSubscriber`] — the publish and subscribe
//!   seams, with redis pub/sub implementations for cross-process delivery
//!   (worker publishes, API relay subscribes).
//! - [`EventBus`] — in-process implementation of both seams backed by a
//!   `tokio::sync::broadcast` channel.

pub mod bus;
pub mod error;
pub mod event;
pub mod publisher;
pub mod subscriber;

pub use bus::EventBus;
pub use error::{EventError, EventResult};
pub use event::{job_channel, session_channel, StatusEvent};
pub use publisher::{EventPublisher, RedisEventPublisher};
pub use subscriber::{EventSubscriber, RedisEventSubscriber, Subscription};
