//! Logging setup for services embedding the resilience core.
//!
//! The core only emits `tracing` events; this crate installs the subscriber that renders them.
mod logger;
pub use logger::*;
