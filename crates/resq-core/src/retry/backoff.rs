use std::time::Duration;

use rand::Rng;
use resq_model::JitterRange;

/// Runtime delay schedule derived from a [`resq_model::RetryPolicy`].
///
/// Delays are computed in two steps:
/// - `base(n) = min(initial * multiplier^(n - 1), max)` for the attempt `n` that just failed;
/// - `delay = base * uniform(jitter.min_factor, jitter.max_factor)`.
///
/// With `honor_suggested` the base is first raised to the classifier hint
/// (still capped at `max`).
#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    pub jitter: JitterRange,
    pub honor_suggested: bool,
}

impl Backoff {
    /// Pre-jitter delay after the failure of `attempt` (1-based).
    pub fn base(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        let capped = raw.min(self.max.as_secs_f64());

        let base = if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else if capped.is_finite() {
            Duration::ZERO
        } else {
            self.max
        };

        match suggested {
            Some(hint) if self.honor_suggested => base.max(hint).min(self.max),
            _ => base,
        }
    }

    /// Scale `base` by `factor`; used with a factor drawn from the jitter range.
    pub fn scaled(base: Duration, factor: f64) -> Duration {
        base.mul_f64(factor.clamp(0.0, 1.0))
    }

    /// Jittered delay after the failure of `attempt`.
    pub fn delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        let base = self.base(attempt, suggested);
        if self.jitter.is_deterministic() {
            return base;
        }
        let factor = rand::rng().random_range(self.jitter.min_factor..=self.jitter.max_factor);
        Self::scaled(base, factor)
    }

    /// Inclusive bounds that [`Backoff::delay`] can return for `attempt`.
    pub fn bounds(&self, attempt: u32, suggested: Option<Duration>) -> (Duration, Duration) {
        let base = self.base(attempt, suggested);
        (
            Self::scaled(base, self.jitter.min_factor),
            Self::scaled(base, self.jitter.max_factor),
        )
    }
}
