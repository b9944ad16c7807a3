//! Per-key circuit breaker.
//!
//! All callers that use the same key share one [`cell::CircuitCell`] behind a mutex.
//! Admission and outcome recording are each a single critical section, so transitions are
//! linearizable per key; different keys never share a lock.
//!
//! ```text
//! Closed ──(failures >= threshold)──► Open ──(reset timeout, next call)──► HalfOpen
//!   ▲                                  ▲                                     │
//!   └──────(successes >= threshold)────┼─────────────────────────────────────┤
//!                                      └──────────(any failure)──────────────┘
//! ```
mod cell;
pub use cell::BreakerSettings;

mod registry;
pub use registry::{CircuitRegistry, CircuitSnapshot};

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use resq_model::{BreakerPolicy, CircuitState, Classification};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::CoreError,
    map::to_breaker_settings,
    metrics::{MetricsHandle, noop_metrics},
};
use cell::{Admission, CircuitCell, Ticket, Transition};

/// Handle to one shared circuit.
///
/// Cheap to clone; clones observe and mutate the same state.
#[derive(Clone)]
pub struct CircuitBreaker {
    key: Arc<str>,
    settings: BreakerSettings,
    cell: Arc<Mutex<CircuitCell>>,
    metrics: MetricsHandle,
}

impl CircuitBreaker {
    /// Standalone breaker with its own state.
    ///
    /// Use [`CircuitRegistry::breaker`] to share state between handles of the same key.
    pub fn new(key: impl Into<Arc<str>>, policy: &BreakerPolicy) -> Result<Self, CoreError> {
        policy.validate()?;
        Ok(Self::with_cell(
            key.into(),
            to_breaker_settings(policy),
            Arc::default(),
        ))
    }

    pub(crate) fn with_cell(
        key: Arc<str>,
        settings: BreakerSettings,
        cell: Arc<Mutex<CircuitCell>>,
    ) -> Self {
        Self {
            key,
            settings,
            cell,
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Stored state. An `Open` circuit whose timeout elapsed stays `Open` until the next call.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot::of(&self.key, &self.lock())
    }

    /// Force the circuit back to `Closed` with cleared counters.
    pub fn reset(&self) {
        let transition = self.lock().reset();
        self.report(transition);
    }

    /// Run `f` if the circuit admits the call.
    ///
    /// A rejected call returns a `CircuitOpen` classification without invoking `f`.
    /// An admitted call's final result updates the circuit. If the returned future is
    /// dropped before `f` completes, the call counts as neither success nor failure.
    pub async fn guard<T, F, Fut>(&self, f: F) -> Result<T, Classification>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Classification>>,
    {
        let permit = self.acquire()?;
        let result = f().await;
        permit.settle(result.is_ok());
        result
    }

    fn acquire(&self) -> Result<Permit<'_>, Classification> {
        let (admission, transition) = self.lock().admit(&self.settings, Instant::now());
        self.report(transition);

        match admission {
            Admission::Admitted(ticket) => Ok(Permit {
                breaker: self,
                ticket,
                settled: false,
            }),
            Admission::Rejected { retry_after } => {
                self.metrics.record_fast_fail(&self.key);
                debug!(key = %self.key, retry_after_ms = ?retry_after.map(|d| d.as_millis()), "circuit open; failing fast");
                Err(Classification::circuit_open(&self.key, retry_after))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CircuitCell> {
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn report(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };
        self.metrics.record_circuit_transition(&self.key, from, to);
        match to {
            CircuitState::Open => warn!(key = %self.key, %from, %to, "circuit opened"),
            CircuitState::HalfOpen => info!(key = %self.key, %from, %to, "circuit half-open; admitting trial calls"),
            CircuitState::Closed => info!(key = %self.key, %from, %to, "circuit closed"),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("key", &self.key)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}

/// Admission held for the duration of one guarded call.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Ticket,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        let b = self.breaker;
        let now = Instant::now();
        let transition = {
            let mut cell = b.lock();
            if success {
                cell.on_success(self.ticket, &b.settings, now)
            } else {
                cell.on_failure(self.ticket, &b.settings, now)
            }
        };
        b.report(transition);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.lock().release(self.ticket);
        }
    }
}
