use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Classification, domain::StageName};

/// Per-stage entry of the diagnostic trail, in walk order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDiagnostic {
    pub stage: StageName,
    /// Attempts that reached the operation; `0` when the circuit rejected the call.
    pub attempts: u32,
    pub elapsed_ms: u64,
    /// `true` if the circuit was open and the operation was never invoked.
    pub fast_failed: bool,
    /// Final classification, `None` if the stage succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Classification>,
}

impl StageDiagnostic {
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Value returned to the caller of a degradation run. Always produced, never an error.
///
/// Three shapes:
/// - primary success: `result` set, `degraded == false`;
/// - fallback success: `result` set, `degraded == true`;
/// - failure: `result == None`, `degraded == true`, `terminal_error` explains why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport<T> {
    pub succeeded_at_stage: Option<StageName>,
    pub result: Option<T>,
    /// Attempt counts for every stage that was reached. Stages never reached are absent.
    pub attempts_per_stage: BTreeMap<StageName, u32>,
    pub total_elapsed_ms: u64,
    pub degraded: bool,
    pub terminal_error: Option<Classification>,
    #[serde(default)]
    pub diagnostics: Vec<StageDiagnostic>,
}

impl<T> OutcomeReport<T> {
    /// Returns `true` if some stage produced a result.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    /// Attempts recorded for `stage`, `0` when the stage was never reached.
    pub fn attempts_for(&self, stage: &str) -> u32 {
        self.attempts_per_stage.get(stage).copied().unwrap_or(0)
    }

    /// Total attempts across the whole walk.
    pub fn total_attempts(&self) -> u32 {
        self.attempts_per_stage.values().sum()
    }

    /// Map the result value, keeping all diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OutcomeReport<U> {
        OutcomeReport {
            succeeded_at_stage: self.succeeded_at_stage,
            result: self.result.map(f),
            attempts_per_stage: self.attempts_per_stage,
            total_elapsed_ms: self.total_elapsed_ms,
            degraded: self.degraded,
            terminal_error: self.terminal_error,
            diagnostics: self.diagnostics,
        }
    }
}
