//! Request middleware.
//!
//! - [`rate_limit::enforce`] -- fixed-window rate limiting per client IP.

pub mod rate_limit;
