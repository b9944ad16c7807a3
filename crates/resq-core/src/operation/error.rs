use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by an [`super::Operation`].
///
/// Drivers that know what went wrong use a typed variant; everything else is wrapped
/// in [`BackendError::Coded`] (driver error code plus message) or [`BackendError::Other`]
/// and left to the classifier's code and message tables.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection timed out: {0}")]
    ConnectionTimeout(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("query timed out: {0}")]
    QueryTimeout(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend misconfigured: {0}")]
    Misconfigured(String),

    #[error("[{code}] {message}")]
    Coded { code: String, message: String },

    #[error(transparent)]
    Other(BoxError),
}

impl BackendError {
    /// Wrap any error whose shape is not known to this crate.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        BackendError::Other(error.into())
    }

    /// Error carrying a driver-specific code (SQLSTATE, ORM error code, ...).
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Coded {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_to_network() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err: BackendError = io.into();
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[test]
    fn other_is_transparent() {
        let err = BackendError::other("socket hang up");
        assert_eq!(err.to_string(), "socket hang up");
    }

    #[test]
    fn coded_display_includes_code() {
        let err = BackendError::coded("40001", "could not serialize access");
        assert_eq!(err.to_string(), "[40001] could not serialize access");
    }
}
