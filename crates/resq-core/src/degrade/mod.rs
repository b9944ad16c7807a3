//! Ordered fallback cascade.
//!
//! A [`DegradationPlan`] is fixed at construction: stages are tried in order and the only
//! decision the [`DegradationCoordinator`] makes is whether the current stage succeeded.
//! Every run ends in an [`resq_model::OutcomeReport`], never an error.
mod context;
pub use context::PlanContext;

mod coordinator;
pub use coordinator::{DegradationCoordinator, RunOptions};

mod id;
pub use id::make_run_id;

mod plan;
pub use plan::{DegradationPlan, DegradationStage, PlanBuilder};
