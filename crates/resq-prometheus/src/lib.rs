//! Prometheus metrics backend for the resilience core.
//!
//! [`PrometheusMetrics`] implements [`resq_core::MetricsBackend`]; inject it through a
//! [`resq_core::PlanContext`] so executors, circuits and coordinators all report to it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use resq_core::PlanContext;
//! use resq_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = PlanContext::default().with_metrics(Arc::new(metrics.clone()));
//!
//! // Later, from a `/metrics` handler:
//! let body = metrics.encode_text()?;
//! # let _ = (ctx, body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `resq_attempts_total{operation, outcome}` - Counter
//! - `resq_stage_completed_total{stage, outcome}` - Counter
//! - `resq_stage_duration_seconds{stage}` - Histogram
//! - `resq_circuit_transitions_total{key, from, to}` - Counter
//! - `resq_circuit_state{key}` - Gauge (0 closed, 1 half-open, 2 open)
//! - `resq_fast_fails_total{key}` - Counter
//! - `resq_runs_total{plan, outcome}` - Counter
//! - `resq_run_duration_seconds{plan}` - Histogram
//!
//! This crate does not serve HTTP; expose [`PrometheusMetrics::encode_text`] from the host's
//! existing server.
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
