//! Metrics collection abstraction for resilient execution.
//!
//! This module provides a backend interface for collecting runtime metrics from retries, circuits and runs.
//! Metrics backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are injected via [`crate::PlanContext`].
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, RunOutcome, StageOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
