use std::fmt;

use crate::{breaker::CircuitRegistry, metrics::MetricsHandle};

/// Shared dependencies injected into every plan built from it.
///
/// Plans built from the same context share circuits: a stage keyed `pg-primary` in two
/// different plans protects one backend with one circuit.
#[derive(Clone)]
pub struct PlanContext {
    registry: CircuitRegistry,
    metrics: MetricsHandle,
}

impl PlanContext {
    /// Create a new context with the given params.
    ///
    /// The registry is switched to `metrics` so circuit transitions land in the same backend.
    pub fn new(registry: CircuitRegistry, metrics: MetricsHandle) -> Self {
        Self {
            registry: registry.with_metrics(metrics.clone()),
            metrics,
        }
    }

    /// Get a reference to the shared circuit registry.
    pub fn registry(&self) -> &CircuitRegistry {
        &self.registry
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Replace the registry and return updated context.
    pub fn with_registry(self, registry: CircuitRegistry) -> Self {
        Self::new(registry, self.metrics)
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(self, metrics: MetricsHandle) -> Self {
        Self::new(self.registry, metrics)
    }
}

impl Default for PlanContext {
    fn default() -> Self {
        Self {
            registry: CircuitRegistry::new(),
            metrics: crate::metrics::noop_metrics(),
        }
    }
}

impl fmt::Debug for PlanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanContext")
            .field("circuits", &self.registry.len())
            .field("metrics", &"<handle>")
            .finish()
    }
}

impl fmt::Display for PlanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanContext(circuits={})", self.registry.len())
    }
}
