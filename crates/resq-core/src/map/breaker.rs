use std::time::Duration;

use resq_model::BreakerPolicy;

use crate::breaker::BreakerSettings;

pub fn to_breaker_settings(p: &BreakerPolicy) -> BreakerSettings {
    BreakerSettings {
        failure_threshold: p.failure_threshold,
        reset_timeout: Duration::from_millis(p.reset_timeout_ms),
        success_threshold: p.success_threshold,
        half_open_max_calls: p.half_open_max_calls,
    }
}
