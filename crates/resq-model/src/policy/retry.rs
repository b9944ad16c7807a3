use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    domain::{
        DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
        DEFAULT_MAX_DELAY_MS, DelayMs,
    },
    error::{ModelError, ModelResult},
};

/// Attempt loop configuration for one stage.
///
/// The delay before attempt `n + 1` (for `n >= 1`) is
/// `min(initial_delay_ms * backoff_multiplier^(n - 1), max_delay_ms)`,
/// scaled by a factor drawn from [`super::JitterRange`].
///
/// Invariants (checked by [`RetryPolicy::validate`]):
/// - `max_attempts >= 1`
/// - `initial_delay_ms <= max_delay_ms`
/// - `backoff_multiplier >= 1`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base delay before the second attempt.
    pub initial_delay_ms: DelayMs,
    /// Upper bound for any single delay.
    pub max_delay_ms: DelayMs,
    /// Exponential growth factor.
    pub backoff_multiplier: f64,
    /// Random scaling applied to each base delay.
    pub jitter: super::JitterRange,
    /// Emit one structured log event per attempt.
    pub enable_logging: bool,
    /// Raise the base delay to the classifier's suggested delay when that is larger.
    pub honor_suggested_delay: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: super::JitterRange::default(),
            enable_logging: true,
            honor_suggested_delay: false,
        }
    }
}

impl RetryPolicy {
    /// Policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Builder-style override of `max_attempts`.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builder-style override of the delay schedule.
    pub fn with_delays(mut self, initial_ms: DelayMs, max_ms: DelayMs, multiplier: f64) -> Self {
        self.initial_delay_ms = initial_ms;
        self.max_delay_ms = max_ms;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Builder-style override of the jitter range.
    pub fn with_jitter(mut self, jitter: super::JitterRange) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.max_attempts == 0 {
            return Err(ModelError::InvalidRetryPolicy(
                "maxAttempts must be at least 1".into(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ModelError::InvalidRetryPolicy(format!(
                "initialDelayMs ({}) exceeds maxDelayMs ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ModelError::InvalidRetryPolicy(format!(
                "backoffMultiplier must be >= 1, got {}",
                self.backoff_multiplier
            )));
        }
        self.jitter
            .validate()
            .map_err(|e| ModelError::InvalidRetryPolicy(e.to_string()))
    }
}
