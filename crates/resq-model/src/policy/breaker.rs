use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    domain::{
        DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT_MS, DEFAULT_SUCCESS_THRESHOLD, DelayMs,
    },
    error::{ModelError, ModelResult},
};

/// Thresholds of the per-key circuit state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerPolicy {
    /// Consecutive failed calls that move `Closed` to `Open`.
    pub failure_threshold: u32,
    /// Minimum time spent `Open` before the next call is admitted as a trial.
    pub reset_timeout_ms: DelayMs,
    /// Trial successes that move `HalfOpen` to `Closed`.
    pub success_threshold: u32,
    /// Trial calls allowed in flight at once while `HalfOpen`.
    pub half_open_max_calls: u32,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            half_open_max_calls: DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

impl BreakerPolicy {
    pub fn validate(&self) -> ModelResult<()> {
        if self.failure_threshold == 0 {
            return Err(ModelError::InvalidBreakerPolicy(
                "failureThreshold must be at least 1".into(),
            ));
        }
        if self.success_threshold == 0 {
            return Err(ModelError::InvalidBreakerPolicy(
                "successThreshold must be at least 1".into(),
            ));
        }
        if self.half_open_max_calls == 0 {
            return Err(ModelError::InvalidBreakerPolicy(
                "halfOpenMaxCalls must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let p = BreakerPolicy::default();
        assert_eq!(p.failure_threshold, 5);
        assert_eq!(p.reset_timeout_ms, 60_000);
        assert_eq!(p.success_threshold, 2);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_zero_thresholds() {
        let p = BreakerPolicy {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(p.validate().is_err());

        let p = BreakerPolicy {
            half_open_max_calls: 0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn serde_uses_defaults_for_missing_fields() {
        let p: BreakerPolicy = serde_json::from_str(r#"{"failureThreshold": 2}"#).unwrap();
        assert_eq!(p.failure_threshold, 2);
        assert_eq!(p.reset_timeout_ms, DEFAULT_RESET_TIMEOUT_MS);
    }
}
