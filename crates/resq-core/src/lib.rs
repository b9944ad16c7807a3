//! Resilient execution of unreliable remote operations.
//!
//! Layers, bottom-up:
//! - [`classifier`]: maps a [`BackendError`] to a [`resq_model::Classification`];
//! - [`retry`]: runs one operation under a [`resq_model::RetryPolicy`];
//! - [`breaker`]: per-key circuit state shared by all callers;
//! - [`degrade`]: walks an ordered plan of stages and always returns an [`resq_model::OutcomeReport`].
pub mod breaker;
pub mod classifier;
pub mod degrade;
pub mod error;
pub mod map;
pub mod operation;
pub mod retry;

mod metrics;
pub use metrics::*;

pub use breaker::{CircuitBreaker, CircuitRegistry, CircuitSnapshot};
pub use classifier::classify;
pub use degrade::{
    DegradationCoordinator, DegradationPlan, DegradationStage, PlanBuilder, PlanContext, RunOptions,
};
pub use error::CoreError;
pub use operation::{BackendError, Operation, OperationFn, OperationRef};
pub use retry::{AttemptLog, Backoff, Execution, RetryExecutor};

pub mod prelude {
    pub use crate::breaker::{CircuitBreaker, CircuitRegistry};
    pub use crate::degrade::{DegradationCoordinator, DegradationPlan, PlanContext, RunOptions};
    pub use crate::error::CoreError;
    pub use crate::operation::{BackendError, Operation, OperationFn, OperationRef};
    pub use crate::retry::RetryExecutor;
}
