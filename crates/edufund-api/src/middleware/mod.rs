//! Request middleware: counters and per-client rate limiting.

pub mod metrics;
pub mod rate_limit;
