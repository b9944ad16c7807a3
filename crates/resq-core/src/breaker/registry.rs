use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use resq_model::{BreakerPolicy, CircuitState};
use serde::Serialize;
use tokio::time::Instant;
use tracing::warn;

use super::{CircuitBreaker, BreakerSettings, cell::CircuitCell};
use crate::{
    error::CoreError,
    map::to_breaker_settings,
    metrics::{MetricsHandle, noop_metrics},
};

/// Point-in-time view of one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub key: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
    /// Time since the circuit last opened; `None` unless `Open` or `HalfOpen`.
    pub opened_for_ms: Option<u64>,
}

impl CircuitSnapshot {
    pub(crate) fn of(key: &str, cell: &CircuitCell) -> Self {
        let now = Instant::now();
        Self {
            key: key.to_string(),
            state: cell.state,
            consecutive_failures: cell.consecutive_failures,
            half_open_successes: cell.half_open_successes,
            opened_for_ms: cell
                .opened_at
                .map(|at| now.saturating_duration_since(at))
                .map(|d: Duration| d.as_millis() as u64),
        }
    }
}

#[derive(Clone)]
struct Slot {
    settings: BreakerSettings,
    cell: Arc<Mutex<CircuitCell>>,
}

/// Process-wide table of circuits, one per key.
///
/// Every [`CircuitBreaker`] handed out for a key shares the same state, so concurrent
/// requests protecting the same backend see one circuit. The thresholds of the first
/// registration for a key win.
#[derive(Clone)]
pub struct CircuitRegistry {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    metrics: MetricsHandle,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self {
            slots: Arc::default(),
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend used by breakers created afterwards.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get or create the breaker for `key`.
    pub fn breaker(&self, key: &str, policy: &BreakerPolicy) -> Result<CircuitBreaker, CoreError> {
        policy.validate()?;
        let wanted = to_breaker_settings(policy);

        let existing = self.read().get(key).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .write()
                .entry(key.to_string())
                .or_insert_with(|| Slot {
                    settings: wanted.clone(),
                    cell: Arc::default(),
                })
                .clone(),
        };

        if slot.settings != wanted {
            warn!(key, "circuit already registered with different thresholds; keeping the first");
        }

        Ok(
            CircuitBreaker::with_cell(Arc::from(key), slot.settings, slot.cell)
                .with_metrics(self.metrics.clone()),
        )
    }

    /// Snapshot every registered circuit, sorted by key.
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let slots = self.read();
        let mut out: Vec<_> = slots
            .iter()
            .map(|(key, slot)| CircuitSnapshot::of(key, &lock(&slot.cell)))
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Stored state of `key`, if registered.
    pub fn state(&self, key: &str) -> Option<CircuitState> {
        self.read().get(key).map(|slot| lock(&slot.cell).state)
    }

    /// Close one circuit. Returns `false` if the key is unknown.
    pub fn reset(&self, key: &str) -> bool {
        let Some(slot) = self.read().get(key).cloned() else {
            return false;
        };
        CircuitBreaker::with_cell(Arc::from(key), slot.settings, slot.cell)
            .with_metrics(self.metrics.clone())
            .reset();
        true
    }

    /// Close every circuit.
    pub fn reset_all(&self) {
        let keys: Vec<String> = self.read().keys().cloned().collect();
        for key in keys {
            self.reset(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircuitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitRegistry")
            .field("circuits", &self.len())
            .finish()
    }
}

fn lock(cell: &Mutex<CircuitCell>) -> std::sync::MutexGuard<'_, CircuitCell> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
