use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Failure domain matched by the classifier.
///
/// The category is informational: decisions are taken on [`super::ClassificationKind`] only.
/// It is kept on every classification so diagnostics and metrics can tell
/// "pool exhausted" apart from "connection refused" without re-parsing messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// Connection timeout, refused or reset.
    ConnectionFailure,
    /// Too many concurrent connections / pool checkout timeout.
    PoolExhausted,
    /// Serialization failure, deadlock, write conflict.
    TransactionConflict,
    /// DNS or socket level I/O error.
    Network,
    /// The query itself is too slow to ever finish in time.
    QueryTimeout,
    /// Malformed query or invalid arguments.
    InvalidQuery,
    /// Uniqueness / integrity constraint violation.
    ConstraintViolation,
    /// Referenced resource does not exist.
    NotFound,
    /// Backend unreachable or misconfigured at startup.
    Unreachable,
    /// Nothing matched.
    Unclassified,
    /// Rejected by an open circuit.
    CircuitOpen,
    /// Run deadline elapsed.
    Deadline,
    /// Run cancelled by the caller.
    Cancelled,
}

impl ErrorCategory {
    /// Return label value for metrics and logs.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorCategory::ConnectionFailure => "connection_failure",
            ErrorCategory::PoolExhausted => "pool_exhausted",
            ErrorCategory::TransactionConflict => "transaction_conflict",
            ErrorCategory::Network => "network",
            ErrorCategory::QueryTimeout => "query_timeout",
            ErrorCategory::InvalidQuery => "invalid_query",
            ErrorCategory::ConstraintViolation => "constraint_violation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Unreachable => "unreachable",
            ErrorCategory::Unclassified => "unclassified",
            ErrorCategory::CircuitOpen => "circuit_open",
            ErrorCategory::Deadline => "deadline",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for ErrorCategory {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "connection_failure" => Ok(ErrorCategory::ConnectionFailure),
            "pool_exhausted" => Ok(ErrorCategory::PoolExhausted),
            "transaction_conflict" => Ok(ErrorCategory::TransactionConflict),
            "network" => Ok(ErrorCategory::Network),
            "query_timeout" => Ok(ErrorCategory::QueryTimeout),
            "invalid_query" => Ok(ErrorCategory::InvalidQuery),
            "constraint_violation" => Ok(ErrorCategory::ConstraintViolation),
            "not_found" => Ok(ErrorCategory::NotFound),
            "unreachable" => Ok(ErrorCategory::Unreachable),
            "unclassified" => Ok(ErrorCategory::Unclassified),
            "circuit_open" => Ok(ErrorCategory::CircuitOpen),
            "deadline" => Ok(ErrorCategory::Deadline),
            "cancelled" => Ok(ErrorCategory::Cancelled),
            other => Err(ModelError::UnknownCategory(other.to_string())),
        }
    }
}
