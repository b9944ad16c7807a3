use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use resq_model::{BreakerPolicy, Classification, PlanSpec, RetryPolicy, StageName, StageSpec};

use super::PlanContext;
use crate::{
    breaker::CircuitBreaker,
    error::CoreError,
    operation::OperationRef,
    retry::{AttemptLog, RetryExecutor},
};

/// One strategy in the cascade: an operation wrapped in its retry loop and circuit.
pub struct DegradationStage<Req, T> {
    name: StageName,
    operation: OperationRef<Req, T>,
    executor: RetryExecutor,
    breaker: CircuitBreaker,
}

impl<Req, T> DegradationStage<Req, T>
where
    Req: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// `breaker.guard(|| executor.execute(operation(request)))`, recording attempts into `log`.
    pub(crate) async fn call(&self, request: &Req, log: &mut AttemptLog) -> Result<T, Classification> {
        let operation = &self.operation;
        self.breaker
            .guard(|| {
                self.executor
                    .execute_into(&self.name, || operation.call(request), log)
            })
            .await
    }
}

impl<Req, T> fmt::Debug for DegradationStage<Req, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DegradationStage")
            .field("name", &self.name)
            .field("key", &self.breaker.key())
            .field("retry", self.executor.policy())
            .finish()
    }
}

/// Ordered, immutable fallback cascade.
///
/// Cheap to clone; clones share stages and circuits.
pub struct DegradationPlan<Req, T> {
    name: String,
    deadline: Option<Duration>,
    stages: Arc<[DegradationStage<Req, T>]>,
    ctx: PlanContext,
}

impl<Req, T> DegradationPlan<Req, T>
where
    Req: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Start a plan in code; stages are added in fallback order.
    pub fn builder(name: impl Into<String>) -> PlanBuilder<Req, T> {
        PlanBuilder {
            spec: PlanSpec::new(name),
            operations: HashMap::new(),
        }
    }

    /// Wire named operations into the stages described by `spec`.
    ///
    /// Every stage needs exactly one operation registered under its name; leftovers are
    /// rejected so a typo in configuration cannot silently drop a strategy.
    pub fn from_spec(
        spec: &PlanSpec,
        mut operations: HashMap<String, OperationRef<Req, T>>,
        ctx: &PlanContext,
    ) -> Result<Self, CoreError> {
        spec.validate()?;

        let mut stages = Vec::with_capacity(spec.stages.len());
        for stage in &spec.stages {
            let operation = operations
                .remove(&stage.name)
                .ok_or_else(|| CoreError::MissingOperation(stage.name.clone()))?;
            stages.push(build_stage(stage, operation, ctx)?);
        }

        if let Some(extra) = operations.keys().min() {
            return Err(CoreError::UnknownStage(extra.clone()));
        }

        Ok(Self {
            name: spec.name.clone(),
            deadline: spec.deadline_ms.map(Duration::from_millis),
            stages: stages.into(),
            ctx: ctx.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-run budget, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn stages(&self) -> &[DegradationStage<Req, T>] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&DegradationStage<Req, T>> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn context(&self) -> &PlanContext {
        &self.ctx
    }
}

fn build_stage<Req, T>(
    spec: &StageSpec,
    operation: OperationRef<Req, T>,
    ctx: &PlanContext,
) -> Result<DegradationStage<Req, T>, CoreError> {
    Ok(DegradationStage {
        name: spec.name.clone(),
        operation,
        executor: RetryExecutor::new(spec.retry.clone())?.with_metrics(ctx.metrics().clone()),
        breaker: ctx.registry().breaker(spec.circuit_key(), &spec.breaker)?,
    })
}

impl<Req, T> Clone for DegradationPlan<Req, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            deadline: self.deadline,
            stages: Arc::clone(&self.stages),
            ctx: self.ctx.clone(),
        }
    }
}

impl<Req, T> fmt::Debug for DegradationPlan<Req, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DegradationPlan")
            .field("name", &self.name)
            .field("deadline", &self.deadline)
            .field("stages", &self.stages)
            .finish()
    }
}

/// In-code counterpart of [`PlanSpec`].
pub struct PlanBuilder<Req, T> {
    spec: PlanSpec,
    operations: HashMap<String, OperationRef<Req, T>>,
}

impl<Req, T> PlanBuilder<Req, T>
where
    Req: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Append a stage keyed by its own name.
    pub fn stage(
        self,
        name: impl Into<String>,
        operation: OperationRef<Req, T>,
        retry: RetryPolicy,
        breaker: BreakerPolicy,
    ) -> Self {
        let spec = StageSpec::new(name).with_retry(retry).with_breaker(breaker);
        self.stage_spec(spec, operation)
    }

    /// Append a fully described stage.
    ///
    /// A second operation under an existing name replaces the first, and `build` rejects the
    /// duplicate stage.
    pub fn stage_spec(mut self, spec: StageSpec, operation: OperationRef<Req, T>) -> Self {
        self.operations.insert(spec.name.clone(), operation);
        self.spec.stages.push(spec);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.spec.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    pub fn build(self, ctx: &PlanContext) -> Result<DegradationPlan<Req, T>, CoreError> {
        DegradationPlan::from_spec(&self.spec, self.operations, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{BackendError, OperationFn};
    use resq_model::ModelError;

    fn echo() -> OperationRef<String, String> {
        OperationFn::arc(|q: String| async move { Ok::<_, BackendError>(q) })
    }

    fn mk_spec() -> PlanSpec {
        PlanSpec::new("search")
            .stage(StageSpec::new("vector-search"))
            .stage(StageSpec::new("keyword-search").with_key("pg-primary"))
            .with_deadline_ms(1_500)
    }

    fn ops(names: &[&str]) -> HashMap<String, OperationRef<String, String>> {
        names.iter().map(|n| (n.to_string(), echo())).collect()
    }

    #[test]
    fn from_spec_preserves_order_and_keys() {
        let ctx = PlanContext::default();
        let plan = DegradationPlan::from_spec(
            &mk_spec(),
            ops(&["keyword-search", "vector-search"]),
            &ctx,
        )
        .unwrap();

        let names: Vec<_> = plan.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["vector-search", "keyword-search"]);
        assert_eq!(plan.stage("keyword-search").unwrap().breaker().key(), "pg-primary");
        assert_eq!(plan.deadline(), Some(Duration::from_millis(1_500)));
        assert_eq!(ctx.registry().len(), 2);
    }

    #[test]
    fn missing_operation_is_rejected() {
        let err = DegradationPlan::from_spec(&mk_spec(), ops(&["vector-search"]), &PlanContext::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingOperation(name) if name == "keyword-search"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = DegradationPlan::from_spec(
            &mk_spec(),
            ops(&["vector-search", "keyword-search", "graph-search"]),
            &PlanContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::UnknownStage(name) if name == "graph-search"));
    }

    #[test]
    fn invalid_spec_is_a_config_error() {
        let spec = PlanSpec::new("empty");
        let err = DegradationPlan::<String, String>::from_spec(&spec, HashMap::new(), &PlanContext::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(ModelError::InvalidPlan(_))));
    }

    #[test]
    fn builder_rejects_duplicate_stage_names() {
        let err = DegradationPlan::builder("dup")
            .stage("a", echo(), RetryPolicy::default(), BreakerPolicy::default())
            .stage("a", echo(), RetryPolicy::default(), BreakerPolicy::default())
            .build(&PlanContext::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(ModelError::InvalidPlan(_))));
    }

    #[test]
    fn plans_from_one_context_share_circuits() {
        let ctx = PlanContext::default();
        let a = DegradationPlan::builder("a")
            .stage_spec(StageSpec::new("s1").with_key("shared"), echo())
            .build(&ctx)
            .unwrap();
        let b = DegradationPlan::builder("b")
            .stage_spec(StageSpec::new("s2").with_key("shared"), echo())
            .build(&ctx)
            .unwrap();

        a.stages()[0].breaker().reset();
        assert_eq!(ctx.registry().len(), 1);
        assert_eq!(b.stages()[0].breaker().key(), "shared");
    }
}
