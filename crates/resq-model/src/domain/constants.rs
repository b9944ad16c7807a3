//! Common model-level constants.
//!
//! Well-known stage names and policy defaults shared by config, core and the probe binary.
//! Keeping them here avoids scattering magic strings and numbers throughout the codebase.

/// Primary semantic strategy: nearest-neighbour lookup against the vector index.
pub const STAGE_VECTOR_SEARCH: &str = "vector-search";

/// Hybrid / full-text fallback strategy against the relational store.
pub const STAGE_KEYWORD_SEARCH: &str = "keyword-search";

/// Default number of attempts (including the first one) per stage call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt, in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default cap for a single backoff delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

/// Default exponential growth factor between attempts.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Consecutive failures that trip a closed circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Time an open circuit waits before admitting trial calls, in milliseconds.
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 60_000;

/// Trial successes required to close a half-open circuit.
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
