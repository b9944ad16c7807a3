use std::time::Duration;

use resq_model::RetryPolicy;

use crate::retry::Backoff;

pub fn to_backoff(p: &RetryPolicy) -> Backoff {
    Backoff {
        initial: Duration::from_millis(p.initial_delay_ms),
        max: Duration::from_millis(p.max_delay_ms),
        multiplier: p.backoff_multiplier,
        jitter: p.jitter,
        honor_suggested: p.honor_suggested_delay,
    }
}
