use std::sync::Arc;

use resq_model::{AttemptOutcome, CircuitState};

/// How a single stage call ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage produced a result.
    Success,
    /// Stage exhausted its retries or hit a non-retryable error.
    Failure,
    /// Circuit was open; the operation was not invoked.
    FastFail,
    /// The run deadline or cancellation cut the stage short.
    Interrupted,
}

impl StageOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            StageOutcome::Success => "success",
            StageOutcome::Failure => "failure",
            StageOutcome::FastFail => "fast_fail",
            StageOutcome::Interrupted => "interrupted",
        }
    }
}

/// How a whole coordinator run ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The primary stage answered.
    Primary,
    /// A fallback stage answered.
    Degraded,
    /// Every stage failed.
    Exhausted,
    /// A fatal classification abandoned the plan.
    Fatal,
    /// The deadline elapsed.
    Timeout,
    /// The caller cancelled the run.
    Cancelled,
}

impl RunOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RunOutcome::Primary => "primary",
            RunOutcome::Degraded => "degraded",
            RunOutcome::Exhausted => "exhausted",
            RunOutcome::Fatal => "fatal",
            RunOutcome::Timeout => "timeout",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}

/// Backend metrics collection interface.
///
/// This trait abstracts metrics collection across different backends.
/// Implementations are injected via [`crate::PlanContext`] and shared by executors, breakers and coordinators.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record one try of an operation.
    ///
    /// # Arguments
    /// - `operation`: Stage / operation name
    /// - `outcome`: Success or the failure classification
    fn record_attempt(&self, operation: &str, outcome: &AttemptOutcome);
    /// Record the end of one stage call with its outcome and duration.
    ///
    /// # Arguments
    /// - `stage`: Stage name
    /// - `outcome`: How the stage call ended
    /// - `duration_ms`: Time spent in the stage, backoff included
    fn record_stage_completed(&self, stage: &str, outcome: StageOutcome, duration_ms: u64);
    /// Record a circuit state change.
    fn record_circuit_transition(&self, key: &str, from: CircuitState, to: CircuitState);
    /// Record a call rejected by an open circuit.
    fn record_fast_fail(&self, key: &str);
    /// Record the end of a coordinator run.
    fn record_run_completed(&self, plan: &str, outcome: RunOutcome, duration_ms: u64);
}

/// Shared handle to metrics backend.
///
/// Stored in [`crate::PlanContext`] and cloned into each stage.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
