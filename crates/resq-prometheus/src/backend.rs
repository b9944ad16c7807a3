use std::sync::Arc;

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};
use resq_core::{MetricsBackend, RunOutcome, StageOutcome};
use resq_model::{AttemptOutcome, CircuitState};

const NAMESPACE: &str = "resq";

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded by configuration:
/// - `operation`, `stage`, `key`, `plan`: names from the plan configuration;
/// - `outcome`: fixed label sets of [`AttemptOutcome`], [`StageOutcome`], [`RunOutcome`];
/// - `from`, `to`: the three circuit states.
#[derive(Clone)]
pub struct PrometheusMetrics {
    attempts: CounterVec,
    stages: CounterVec,
    stage_duration: HistogramVec,
    transitions: CounterVec,
    circuit_state: IntGaugeVec,
    fast_fails: CounterVec,
    runs: CounterVec,
    run_duration: HistogramVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering its collectors in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let attempts = counter(
            &registry,
            "attempts_total",
            "Operation attempts by outcome",
            &["operation", "outcome"],
        )?;
        let stages = counter(
            &registry,
            "stage_completed_total",
            "Stage calls by outcome",
            &["stage", "outcome"],
        )?;
        let stage_duration = histogram(
            &registry,
            "stage_duration_seconds",
            "Time spent in a stage, backoff included",
            &["stage"],
        )?;
        let transitions = counter(
            &registry,
            "circuit_transitions_total",
            "Circuit state changes",
            &["key", "from", "to"],
        )?;

        let circuit_state = IntGaugeVec::new(
            Opts::new("circuit_state", "Current circuit state (0 closed, 1 half-open, 2 open)")
                .namespace(NAMESPACE),
            &["key"],
        )?;
        registry.register(Box::new(circuit_state.clone()))?;

        let fast_fails = counter(
            &registry,
            "fast_fails_total",
            "Calls rejected by an open circuit",
            &["key"],
        )?;
        let runs = counter(
            &registry,
            "runs_total",
            "Coordinator runs by outcome",
            &["plan", "outcome"],
        )?;
        let run_duration = histogram(
            &registry,
            "run_duration_seconds",
            "Coordinator run duration",
            &["plan"],
        )?;

        Ok(Self {
            attempts,
            stages,
            stage_duration,
            transitions,
            circuit_state,
            fast_fails,
            runs,
            run_duration,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    /// Underlying registry, for registering host metrics alongside these.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<CounterVec, prometheus::Error> {
    let c = CounterVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<HistogramVec, prometheus::Error> {
    let h = HistogramVec::new(
        HistogramOpts::new(name, help)
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        labels,
    )?;
    registry.register(Box::new(h.clone()))?;
    Ok(h)
}

fn state_value(state: CircuitState) -> i64 {
    match state {
        CircuitState::Closed => 0,
        CircuitState::HalfOpen => 1,
        CircuitState::Open => 2,
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_attempt(&self, operation: &str, outcome: &AttemptOutcome) {
        self.attempts
            .with_label_values(&[operation, outcome.as_label()])
            .inc();
    }

    fn record_stage_completed(&self, stage: &str, outcome: StageOutcome, duration_ms: u64) {
        self.stages
            .with_label_values(&[stage, outcome.as_label()])
            .inc();
        self.stage_duration
            .with_label_values(&[stage])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_circuit_transition(&self, key: &str, from: CircuitState, to: CircuitState) {
        self.transitions
            .with_label_values(&[key, from.as_label(), to.as_label()])
            .inc();
        self.circuit_state
            .with_label_values(&[key])
            .set(state_value(to));
    }

    fn record_fast_fail(&self, key: &str) {
        self.fast_fails.with_label_values(&[key]).inc();
    }

    fn record_run_completed(&self, plan: &str, outcome: RunOutcome, duration_ms: u64) {
        self.runs
            .with_label_values(&[plan, outcome.as_label()])
            .inc();
        self.run_duration
            .with_label_values(&[plan])
            .observe(duration_ms as f64 / 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resq_model::{Classification, ErrorCategory};
    use std::time::Duration;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn attempts_are_labelled_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        let refused = Classification::retryable(
            ErrorCategory::ConnectionFailure,
            Duration::from_millis(500),
            "ECONNREFUSED",
        );

        metrics.record_attempt("vector-search", &AttemptOutcome::Failure(refused.clone()));
        metrics.record_attempt("vector-search", &AttemptOutcome::Failure(refused));
        metrics.record_attempt("vector-search", &AttemptOutcome::Success);

        let families = metrics.gather();
        assert_eq!(family(&families, "resq_attempts_total").get_metric().len(), 2);
    }

    #[test]
    fn stage_and_run_record_counter_and_histogram() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_stage_completed("vector-search", StageOutcome::FastFail, 0);
        metrics.record_stage_completed("keyword-search", StageOutcome::Success, 40);
        metrics.record_run_completed("search", RunOutcome::Degraded, 41);

        let families = metrics.gather();
        assert_eq!(family(&families, "resq_stage_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "resq_stage_duration_seconds").get_metric().len(), 2);
        assert_eq!(family(&families, "resq_runs_total").get_metric().len(), 1);
        assert_eq!(family(&families, "resq_run_duration_seconds").get_metric().len(), 1);
    }

    #[test]
    fn transitions_update_state_gauge() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_circuit_transition("pg", CircuitState::Closed, CircuitState::Open);
        metrics.record_fast_fail("pg");
        assert_eq!(metrics.circuit_state.with_label_values(&["pg"]).get(), 2);

        metrics.record_circuit_transition("pg", CircuitState::Open, CircuitState::HalfOpen);
        assert_eq!(metrics.circuit_state.with_label_values(&["pg"]).get(), 1);

        let families = metrics.gather();
        assert_eq!(family(&families, "resq_circuit_transitions_total").get_metric().len(), 2);
        assert_eq!(family(&families, "resq_fast_fails_total").get_metric().len(), 1);
    }

    #[test]
    fn encodes_text_exposition() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_run_completed("search", RunOutcome::Primary, 5);

        let text = metrics.encode_text().unwrap();
        let line = text
            .lines()
            .find(|l| l.starts_with("resq_runs_total{"))
            .expect("runs counter missing");
        assert!(line.contains(r#"plan="search""#));
        assert!(line.contains(r#"outcome="primary""#));
        assert!(line.ends_with(" 1"));
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
