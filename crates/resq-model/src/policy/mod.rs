mod breaker;
pub use breaker::BreakerPolicy;

mod jitter;
pub use jitter::JitterRange;

mod retry;
pub use retry::RetryPolicy;
