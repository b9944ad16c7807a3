use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    domain::{CircuitKey, DelayMs, StageName},
    error::{ModelError, ModelResult},
    policy::{BreakerPolicy, RetryPolicy},
};

/// Declarative description of one degradation stage.
///
/// `StageSpec` says *how* a stage is governed; the operation it calls is supplied in code
/// and matched by `name` when the plan is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct StageSpec {
    /// Unique stage name within the plan (e.g. `vector-search`).
    pub name: StageName,
    /// Circuit identity. Stages sharing a key share one circuit; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<CircuitKey>,
    /// Attempt loop configuration.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Circuit thresholds.
    #[serde(default)]
    pub breaker: BreakerPolicy,
}

impl StageSpec {
    /// Stage with default retry and breaker policies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            retry: RetryPolicy::default(),
            breaker: BreakerPolicy::default(),
        }
    }

    /// Share a circuit with other stages using the same key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: BreakerPolicy) -> Self {
        self.breaker = breaker;
        self
    }

    /// Effective circuit key.
    pub fn circuit_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered fallback cascade, configured once at startup.
///
/// Stages are tried strictly in the listed order; the first one is the primary strategy
/// and any success from a later stage is reported as degraded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    /// Plan name used in logs and run identifiers.
    pub name: String,
    /// Overall budget for one run, covering every stage and backoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<DelayMs>,
    pub stages: Vec<StageSpec>,
}

impl PlanSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadline_ms: None,
            stages: Vec::new(),
        }
    }

    /// Append a stage (builder-style).
    pub fn stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: DelayMs) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// Rules:
    /// - `name` and every stage name are non-empty;
    /// - at least one stage;
    /// - stage names are unique;
    /// - every nested policy validates.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidPlan("plan name is empty".into()));
        }
        if self.stages.is_empty() {
            return Err(ModelError::InvalidPlan(format!(
                "plan '{}' has no stages",
                self.name
            )));
        }
        if self.deadline_ms == Some(0) {
            return Err(ModelError::InvalidPlan("deadlineMs must be positive".into()));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(ModelError::InvalidPlan("stage name is empty".into()));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(ModelError::InvalidPlan(format!(
                    "duplicate stage name: {}",
                    stage.name
                )));
            }
            stage.retry.validate()?;
            stage.breaker.validate()?;
        }
        Ok(())
    }
}
