mod plan;
pub use plan::{PlanSpec, StageSpec};
