//! HTTP handlers.
//!
//! - [`convert`] -- multipart upload ingress creating conversion jobs.
//! - [`jobs`] -- status polling and job listing.

pub mod convert;
pub mod jobs;
