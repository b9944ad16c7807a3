mod domain;
pub use domain::{CircuitKey, DelayMs, StageName};
pub use domain::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_FAILURE_THRESHOLD, DEFAULT_INITIAL_DELAY_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS, DEFAULT_RESET_TIMEOUT_MS,
    DEFAULT_SUCCESS_THRESHOLD, STAGE_KEYWORD_SEARCH, STAGE_VECTOR_SEARCH,
};

mod error;
pub use error::{ModelError, ModelResult};

mod attempt;
pub use attempt::{Attempt, AttemptOutcome};

mod circuit;
pub use circuit::CircuitState;

mod classification;
pub use classification::{Classification, ClassificationKind, ErrorCategory};

mod policy;
pub use policy::{BreakerPolicy, JitterRange, RetryPolicy};

mod report;
pub use report::{OutcomeReport, StageDiagnostic};

mod spec;
pub use spec::{PlanSpec, StageSpec};
