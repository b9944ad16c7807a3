mod category;
pub use category::ErrorCategory;

mod kind;
pub use kind::ClassificationKind;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Outcome of classifying one failure.
///
/// Produced fresh for every error at the operation boundary and passed upward by value.
/// Components above the classifier never look at raw errors, only at this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Decision taken by retry and cascade logic.
    pub kind: ClassificationKind,
    /// Failure domain that produced the decision.
    pub category: ErrorCategory,
    /// Hint for how long to wait before trying again, if the category has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_delay: Option<Duration>,
    /// Human-readable description (usually the original error message).
    pub reason: String,
}

impl Classification {
    pub fn new(
        kind: ClassificationKind,
        category: ErrorCategory,
        suggested_delay: Option<Duration>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            suggested_delay,
            reason: reason.into(),
        }
    }

    /// Transient failure with a suggested retry delay.
    pub fn retryable(category: ErrorCategory, delay: Duration, reason: impl Into<String>) -> Self {
        Self::new(ClassificationKind::Retryable, category, Some(delay), reason)
    }

    /// Failure that retrying cannot fix.
    pub fn non_retryable(category: ErrorCategory, reason: impl Into<String>) -> Self {
        Self::new(ClassificationKind::NonRetryable, category, None, reason)
    }

    /// Failure that invalidates every remaining stage.
    pub fn fatal(category: ErrorCategory, reason: impl Into<String>) -> Self {
        Self::new(ClassificationKind::Fatal, category, None, reason)
    }

    /// Unknown error shape.
    pub fn unclassified(reason: impl Into<String>) -> Self {
        Self::non_retryable(ErrorCategory::Unclassified, reason)
    }

    /// Rejection by an open circuit; `retry_after` is the remaining cool-down.
    pub fn circuit_open(key: &str, retry_after: Option<Duration>) -> Self {
        Self::new(
            ClassificationKind::CircuitOpen,
            ErrorCategory::CircuitOpen,
            retry_after,
            format!("circuit '{key}' is open"),
        )
    }

    /// The run deadline elapsed.
    pub fn timeout(elapsed: Duration) -> Self {
        Self::new(
            ClassificationKind::Timeout,
            ErrorCategory::Deadline,
            None,
            format!("deadline exceeded after {}ms", elapsed.as_millis()),
        )
    }

    /// The run was cancelled by its caller.
    pub fn cancelled() -> Self {
        Self::new(
            ClassificationKind::Cancelled,
            ErrorCategory::Cancelled,
            None,
            "run cancelled",
        )
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind == ClassificationKind::Fatal
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.category, self.reason)
    }
}
