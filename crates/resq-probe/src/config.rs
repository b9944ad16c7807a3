use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use resq_model::{
    BreakerPolicy, PlanSpec, RetryPolicy, STAGE_KEYWORD_SEARCH, STAGE_VECTOR_SEARCH, StageSpec,
};
use resq_observe::LoggerConfig;

/// Simulated backend behaviour for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSim {
    /// Probability in `[0, 1]` that a call fails transiently.
    pub failure_rate: f64,
    /// Probability in `[0, 1]` that a call fails with a permanent query error.
    pub invalid_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for BackendSim {
    fn default() -> Self {
        Self {
            failure_rate: 0.0,
            invalid_rate: 0.0,
            min_latency_ms: 5,
            max_latency_ms: 40,
        }
    }
}

/// Probe configuration, read from an optional JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeConfig {
    pub logger: LoggerConfig,
    pub plan: PlanSpec,
    /// Number of requests to run concurrently.
    pub requests: u32,
    pub vector: BackendSim,
    pub keyword: BackendSim,
    /// Print the Prometheus exposition after the runs.
    pub print_metrics: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            plan: default_plan(),
            requests: 8,
            vector: BackendSim {
                failure_rate: 0.6,
                ..BackendSim::default()
            },
            keyword: BackendSim {
                failure_rate: 0.1,
                ..BackendSim::default()
            },
            print_metrics: false,
        }
    }
}

impl ProbeConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        cfg.plan.validate().context("invalid plan")?;
        Ok(cfg)
    }
}

/// Semantic search first, keyword search as the fallback.
fn default_plan() -> PlanSpec {
    PlanSpec::new("search")
        .with_deadline_ms(2_000)
        .stage(
            StageSpec::new(STAGE_VECTOR_SEARCH)
                .with_retry(RetryPolicy::default())
                .with_breaker(BreakerPolicy {
                    failure_threshold: 3,
                    reset_timeout_ms: 5_000,
                    ..BreakerPolicy::default()
                }),
        )
        .stage(StageSpec::new(STAGE_KEYWORD_SEARCH).with_retry(RetryPolicy::default().with_max_attempts(2)))
}
