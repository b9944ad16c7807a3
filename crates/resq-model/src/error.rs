use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown classification kind: {0}")]
    UnknownKind(String),

    #[error("unknown error category: {0}")]
    UnknownCategory(String),

    #[error("unknown circuit state: {0}")]
    UnknownCircuitState(String),

    #[error("unknown jitter range: {0}")]
    UnknownJitter(String),

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid breaker policy: {0}")]
    InvalidBreakerPolicy(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
