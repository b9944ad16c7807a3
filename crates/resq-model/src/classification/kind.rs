use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Coarse decision derived from a failure.
///
/// Kinds:
/// - `Retryable`: transient, expected to resolve on its own. Retried with backoff.
/// - `NonRetryable`: structural or logical; retrying is wasted work. The cascade moves on.
/// - `Fatal`: affects every stage identically (e.g. misconfiguration). The cascade is abandoned.
/// - `CircuitOpen`: synthetic, emitted by a breaker that refused to call the operation.
/// - `Timeout`: the overall run deadline elapsed.
/// - `Cancelled`: the caller cancelled the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationKind {
    Retryable,
    NonRetryable,
    Fatal,
    CircuitOpen,
    Timeout,
    Cancelled,
}

impl ClassificationKind {
    /// Returns `true` only for [`ClassificationKind::Retryable`].
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassificationKind::Retryable)
    }

    /// Returns `true` for kinds that end a whole run rather than a single stage.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClassificationKind::Fatal | ClassificationKind::Timeout | ClassificationKind::Cancelled
        )
    }

    /// Return label value for metrics and logs.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ClassificationKind::Retryable => "retryable",
            ClassificationKind::NonRetryable => "non_retryable",
            ClassificationKind::Fatal => "fatal",
            ClassificationKind::CircuitOpen => "circuit_open",
            ClassificationKind::Timeout => "timeout",
            ClassificationKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for ClassificationKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "retryable" => Ok(ClassificationKind::Retryable),
            "non_retryable" | "nonretryable" | "permanent" => Ok(ClassificationKind::NonRetryable),
            "fatal" => Ok(ClassificationKind::Fatal),
            "circuit_open" | "circuitopen" => Ok(ClassificationKind::CircuitOpen),
            "timeout" => Ok(ClassificationKind::Timeout),
            "cancelled" | "canceled" => Ok(ClassificationKind::Cancelled),
            other => Err(ModelError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitive() {
        assert_eq!(
            "Non-Retryable".parse::<ClassificationKind>().unwrap(),
            ClassificationKind::NonRetryable
        );
        assert_eq!(
            "CIRCUIT_OPEN".parse::<ClassificationKind>().unwrap(),
            ClassificationKind::CircuitOpen
        );
        assert_eq!(
            "canceled".parse::<ClassificationKind>().unwrap(),
            ClassificationKind::Cancelled
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        for input in ["", "maybe", "retry-later"] {
            assert!(
                input.parse::<ClassificationKind>().is_err(),
                "expected error for {input:?}"
            );
        }
    }

    #[test]
    fn display_matches_parse() {
        for kind in [
            ClassificationKind::Retryable,
            ClassificationKind::NonRetryable,
            ClassificationKind::Fatal,
            ClassificationKind::CircuitOpen,
            ClassificationKind::Timeout,
            ClassificationKind::Cancelled,
        ] {
            assert_eq!(kind.to_string().parse::<ClassificationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn only_run_enders_are_terminal() {
        assert!(ClassificationKind::Fatal.is_terminal());
        assert!(ClassificationKind::Timeout.is_terminal());
        assert!(ClassificationKind::Cancelled.is_terminal());
        assert!(!ClassificationKind::Retryable.is_terminal());
        assert!(!ClassificationKind::NonRetryable.is_terminal());
        assert!(!ClassificationKind::CircuitOpen.is_terminal());
    }
}
