//! Mapping from configuration types in `resq-model` to runtime types in this crate.
mod backoff;
mod breaker;

pub use backoff::to_backoff;
pub use breaker::to_breaker_settings;
