//! Conversion worker: consumes tasks from the broker and drives each job
//! through the `queued -> processing -> completed | failed` state machine.

pub mod config;
pub mod runner;

pub use config::WorkerConfig;
pub use runner::Worker;
