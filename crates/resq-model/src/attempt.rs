use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Classification;

/// Result of a single try.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "classification")]
pub enum AttemptOutcome {
    Success,
    Failure(Classification),
}

impl AttemptOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }

    /// Return label value for metrics and logs.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure(c) => c.kind.as_label(),
        }
    }
}

/// Record of one execution try inside a retry loop.
///
/// Offsets are measured from the start of the retry loop, so records stay
/// meaningful without a wall clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// 1-based position in the loop.
    pub attempt_number: u32,
    pub started_at: Duration,
    pub ended_at: Duration,
    pub outcome: AttemptOutcome,
    /// Backoff slept after this attempt, if another attempt follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_before_next_ms: Option<u64>,
}

impl Attempt {
    #[inline]
    pub fn duration(&self) -> Duration {
        self.ended_at.saturating_sub(self.started_at)
    }
}
