use resq_model::{AttemptOutcome, CircuitState};

use crate::metrics::backend::{MetricsBackend, RunOutcome, StageOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_attempt(&self, _: &str, _: &AttemptOutcome) {}

    #[inline(always)]
    fn record_stage_completed(&self, _: &str, _: StageOutcome, _: u64) {}

    #[inline(always)]
    fn record_circuit_transition(&self, _: &str, _: CircuitState, _: CircuitState) {}

    #[inline(always)]
    fn record_fast_fail(&self, _: &str) {}

    #[inline(always)]
    fn record_run_completed(&self, _: &str, _: RunOutcome, _: u64) {}
}
