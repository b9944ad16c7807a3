mod constants;
pub use constants::*;

/// Logical name of a degradation stage (e.g. `vector-search`).
///
/// Stage names are unique within a plan and are used as keys in
/// [`crate::OutcomeReport::attempts_per_stage`].
pub type StageName = String;

/// Identity of a circuit shared by every caller of the same operation.
///
/// Defaults to the stage name; two stages may share one circuit by using the same key.
pub type CircuitKey = String;

/// Duration value in milliseconds, as used in configuration.
pub type DelayMs = u64;
