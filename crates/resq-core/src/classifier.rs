//! Error classification: the only place raw backend failures are interpreted.
//!
//! [`classify`] is pure and total. Anything it does not recognise becomes
//! `NonRetryable` with category `Unclassified`, so an unknown error never loops.
//!
//! Suggested delays per retryable category:
//! - connection timeout / refused / reset: 500ms
//! - pool exhaustion: 1000ms
//! - transaction conflict: 200ms
//! - generic network I/O: 500ms
use std::{error::Error as StdError, io, time::Duration};

use resq_model::{Classification, ErrorCategory};

use crate::operation::BackendError;

pub const CONNECTION_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const POOL_RETRY_DELAY: Duration = Duration::from_millis(1_000);
pub const CONFLICT_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const NETWORK_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Map a backend failure into a [`Classification`].
pub fn classify(error: &BackendError) -> Classification {
    let reason = error.to_string();
    match error {
        BackendError::ConnectionTimeout(_)
        | BackendError::ConnectionRefused(_)
        | BackendError::ConnectionReset(_) => connection(reason),
        BackendError::PoolExhausted(_) => pool(reason),
        BackendError::TransactionConflict(_) => conflict(reason),
        BackendError::Network(io) => classify_io(io, reason),
        BackendError::QueryTimeout(_) => {
            Classification::non_retryable(ErrorCategory::QueryTimeout, reason)
        }
        BackendError::InvalidQuery(_) => {
            Classification::non_retryable(ErrorCategory::InvalidQuery, reason)
        }
        BackendError::ConstraintViolation(_) => {
            Classification::non_retryable(ErrorCategory::ConstraintViolation, reason)
        }
        BackendError::NotFound(_) => Classification::non_retryable(ErrorCategory::NotFound, reason),
        BackendError::Unreachable(_) | BackendError::Misconfigured(_) => {
            Classification::fatal(ErrorCategory::Unreachable, reason)
        }
        BackendError::Coded { code, message } => classify_code(code)
            .or_else(|| classify_message(message))
            .map(|category| from_category(category, reason.clone()))
            .unwrap_or_else(|| Classification::unclassified(reason)),
        BackendError::Other(inner) => classify_opaque(inner.as_ref(), reason),
    }
}

/// Walk the source chain looking for a known shape, then fall back to message markers.
fn classify_opaque(error: &(dyn StdError + 'static), reason: String) -> Classification {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(backend) = err.downcast_ref::<BackendError>() {
            let mut c = classify(backend);
            c.reason = reason;
            return c;
        }
        if let Some(io) = err.downcast_ref::<io::Error>() {
            return classify_io(io, reason);
        }
        current = err.source();
    }

    match classify_message(&reason) {
        Some(category) => from_category(category, reason),
        None => Classification::unclassified(reason),
    }
}

fn classify_io(error: &io::Error, reason: String) -> Classification {
    use io::ErrorKind::*;
    match error.kind() {
        TimedOut | ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected => {
            connection(reason)
        }
        PermissionDenied => Classification::fatal(ErrorCategory::Unreachable, reason),
        NotFound => Classification::non_retryable(ErrorCategory::NotFound, reason),
        InvalidInput | InvalidData => {
            Classification::non_retryable(ErrorCategory::InvalidQuery, reason)
        }
        _ => Classification::retryable(ErrorCategory::Network, NETWORK_RETRY_DELAY, reason),
    }
}

/// Driver error codes: SQLSTATE classes and Prisma-style `Pxxxx` codes.
fn classify_code(code: &str) -> Option<ErrorCategory> {
    let code = code.trim().to_ascii_uppercase();
    let category = match code.as_str() {
        "P1001" | "P1000" | "P1003" | "P1010" | "28000" | "28P01" | "3D000" => {
            ErrorCategory::Unreachable
        }
        "P1002" | "P1017" => ErrorCategory::ConnectionFailure,
        "P1008" | "57014" => ErrorCategory::QueryTimeout,
        "P2024" | "53300" => ErrorCategory::PoolExhausted,
        "P2034" | "40001" | "40P01" => ErrorCategory::TransactionConflict,
        "P2002" | "P2003" | "P2004" => ErrorCategory::ConstraintViolation,
        "P2025" | "P2001" => ErrorCategory::NotFound,
        "P2009" | "P2012" | "P2019" | "42601" | "42703" | "22P02" => ErrorCategory::InvalidQuery,
        c if c.starts_with("08") => ErrorCategory::ConnectionFailure,
        c if c.starts_with("23") => ErrorCategory::ConstraintViolation,
        _ => return None,
    };
    Some(category)
}

/// Ordered marker table; the first matching row wins.
///
/// Query timeouts are checked before connection timeouts since both say "timeout".
const MESSAGE_MARKERS: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::Unreachable,
        &[
            "can't reach database server",
            "authentication failed",
            "password authentication",
            "database does not exist",
            "invalid connection string",
            "misconfigured",
        ],
    ),
    (
        ErrorCategory::QueryTimeout,
        &["statement timeout", "query timeout", "query timed out", "query_timeout"],
    ),
    (
        ErrorCategory::PoolExhausted,
        &[
            "too many connections",
            "too many clients",
            "remaining connection slots",
            "pool timed out",
            "connection pool",
        ],
    ),
    (
        ErrorCategory::TransactionConflict,
        &[
            "deadlock",
            "could not serialize",
            "serialization failure",
            "write conflict",
            "transaction conflict",
        ],
    ),
    (
        ErrorCategory::ConnectionFailure,
        &[
            "econnrefused",
            "connection refused",
            "econnreset",
            "connection reset",
            "etimedout",
            "connection timed out",
            "connect timeout",
            "server closed the connection",
        ],
    ),
    (
        ErrorCategory::Network,
        &["enotfound", "eai_again", "dns", "socket hang up", "broken pipe", "network"],
    ),
    (
        ErrorCategory::ConstraintViolation,
        &["unique constraint", "duplicate key", "foreign key", "violates", "constraint failed"],
    ),
    (
        ErrorCategory::InvalidQuery,
        &["syntax error", "invalid input", "malformed", "invalid query", "invalid argument"],
    ),
    (
        ErrorCategory::NotFound,
        &["not found", "does not exist", "no such"],
    ),
];

fn classify_message(message: &str) -> Option<ErrorCategory> {
    let lower = message.to_ascii_lowercase();
    MESSAGE_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(category, _)| *category)
}

fn from_category(category: ErrorCategory, reason: String) -> Classification {
    match category {
        ErrorCategory::ConnectionFailure => connection(reason),
        ErrorCategory::PoolExhausted => pool(reason),
        ErrorCategory::TransactionConflict => conflict(reason),
        ErrorCategory::Network => {
            Classification::retryable(ErrorCategory::Network, NETWORK_RETRY_DELAY, reason)
        }
        ErrorCategory::Unreachable => Classification::fatal(category, reason),
        other => Classification::non_retryable(other, reason),
    }
}

fn connection(reason: String) -> Classification {
    Classification::retryable(ErrorCategory::ConnectionFailure, CONNECTION_RETRY_DELAY, reason)
}

fn pool(reason: String) -> Classification {
    Classification::retryable(ErrorCategory::PoolExhausted, POOL_RETRY_DELAY, reason)
}

fn conflict(reason: String) -> Classification {
    Classification::retryable(ErrorCategory::TransactionConflict, CONFLICT_RETRY_DELAY, reason)
}
