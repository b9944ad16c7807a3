//! Attempt loop for a single operation.
//!
//! Attempts are strictly sequential. Only `Retryable` failures are retried;
//! `NonRetryable` and `Fatal` return after the attempt that produced them, with no delay.
//! The backoff sleep is the only suspension point besides the operation itself.
mod backoff;
pub use backoff::Backoff;

use std::{future::Future, time::Duration};

use resq_model::{Attempt, AttemptOutcome, Classification, RetryPolicy};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    classifier::classify,
    error::CoreError,
    map::to_backoff,
    metrics::{MetricsHandle, noop_metrics},
    operation::BackendError,
};

/// Per-invocation attempt records.
///
/// Owned by the caller so the count survives even when the invocation future is dropped
/// mid-flight (deadline, cancellation).
#[derive(Debug, Default, Clone)]
pub struct AttemptLog {
    started: u32,
    attempts: Vec<Attempt>,
}

impl AttemptLog {
    /// Attempts that reached the operation, including one still in flight.
    #[inline]
    pub fn started(&self) -> u32 {
        self.started
    }

    /// Completed attempts.
    #[inline]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Sum of backoff delays scheduled so far.
    pub fn total_delay(&self) -> Duration {
        let ms = self
            .attempts
            .iter()
            .filter_map(|a| a.delay_before_next_ms)
            .sum();
        Duration::from_millis(ms)
    }

    pub fn clear(&mut self) {
        self.started = 0;
        self.attempts.clear();
    }

    fn begin(&mut self) -> u32 {
        self.started += 1;
        self.started
    }

    fn push(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }
}

/// Summary of one [`RetryExecutor::execute`] invocation.
#[derive(Debug)]
pub struct Execution<T> {
    pub result: Result<T, Classification>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs an operation under a [`RetryPolicy`].
///
/// Stateless across calls: the same executor may serve any number of concurrent invocations.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    backoff: Backoff,
    metrics: MetricsHandle,
}

impl RetryExecutor {
    /// Create an executor after validating the policy.
    pub fn new(policy: RetryPolicy) -> Result<Self, CoreError> {
        policy.validate()?;
        Ok(Self {
            backoff: to_backoff(&policy),
            policy,
            metrics: noop_metrics(),
        })
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `op` until it succeeds, fails non-retryably, or attempts are exhausted.
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Execution<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let started = Instant::now();
        let mut log = AttemptLog::default();
        let result = self.execute_into(operation, op, &mut log).await;
        Execution {
            result,
            attempts: log.started(),
            elapsed: started.elapsed(),
        }
    }

    /// Same as [`RetryExecutor::execute`], recording every attempt into `log`.
    pub async fn execute_into<T, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
        log: &mut AttemptLog,
    ) -> Result<T, Classification>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let origin = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let logging = self.policy.enable_logging;

        loop {
            let attempt = log.begin();
            let started_at = origin.elapsed();
            let res = op().await;
            let ended_at = origin.elapsed();

            let failure = match res {
                Ok(value) => {
                    self.metrics
                        .record_attempt(operation, &AttemptOutcome::Success);
                    if logging {
                        debug!(operation, attempt, outcome = "success", delay_ms = 0u64, "attempt succeeded");
                    }
                    log.push(Attempt {
                        attempt_number: attempt,
                        started_at,
                        ended_at,
                        outcome: AttemptOutcome::Success,
                        delay_before_next_ms: None,
                    });
                    return Ok(value);
                }
                Err(e) => classify(&e),
            };

            let delay = (failure.is_retryable() && attempt < max_attempts)
                .then(|| self.backoff.delay(attempt, failure.suggested_delay));
            let outcome = AttemptOutcome::Failure(failure.clone());
            self.metrics.record_attempt(operation, &outcome);
            log.push(Attempt {
                attempt_number: attempt,
                started_at,
                ended_at,
                outcome,
                delay_before_next_ms: delay.map(|d| d.as_millis() as u64),
            });

            let Some(delay) = delay else {
                if logging {
                    warn!(
                        operation,
                        attempt,
                        outcome = failure.kind.as_label(),
                        delay_ms = 0u64,
                        reason = %failure.reason,
                        "attempt failed; giving up"
                    );
                }
                return Err(failure);
            };

            if logging {
                debug!(
                    operation,
                    attempt,
                    outcome = failure.kind.as_label(),
                    delay_ms = delay.as_millis() as u64,
                    reason = %failure.reason,
                    "attempt failed; retry scheduled"
                );
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resq_model::{ClassificationKind, JitterRange};
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn mk_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_delays(100, 2_000, 2.0)
            .with_jitter(JitterRange::EQUAL)
    }

    fn refused() -> BackendError {
        BackendError::ConnectionRefused("db:5432".into())
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failures_use_exactly_max_attempts() {
        for n in 1..=5 {
            let exec = RetryExecutor::new(mk_policy(n)).unwrap();
            let calls = Arc::new(AtomicU32::new(0));

            let c = calls.clone();
            let out = exec
                .execute("op", || {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(refused()) }
                })
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), n);
            assert_eq!(out.attempts, n);
            let err = out.result.unwrap_err();
            assert_eq!(err.kind, ClassificationKind::Retryable);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_stops_after_first_attempt_without_delay() {
        for err in [
            BackendError::InvalidQuery("bad".into()),
            BackendError::Unreachable("no route".into()),
        ] {
            let exec = RetryExecutor::new(mk_policy(5)).unwrap();
            let mut log = AttemptLog::default();
            let mut slot = Some(err);

            let before = Instant::now();
            let res = exec
                .execute_into(
                    "op",
                    || {
                        let e = slot.take().unwrap_or_else(refused);
                        async move { Err::<(), _>(e) }
                    },
                    &mut log,
                )
                .await;

            assert!(res.is_err());
            assert_eq!(log.started(), 1);
            assert_eq!(log.attempts()[0].delay_before_next_ms, None);
            assert_eq!(Instant::now(), before, "no virtual time should pass");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures_with_jittered_delays() {
        let exec = RetryExecutor::new(mk_policy(3)).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let mut log = AttemptLog::default();

        let c = calls.clone();
        let res = exec
            .execute_into(
                "op",
                || {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { if n < 3 { Err(refused()) } else { Ok(n) } }
                },
                &mut log,
            )
            .await;

        assert_eq!(res.unwrap(), 3);
        assert_eq!(log.started(), 3);

        let delays: Vec<u64> = log
            .attempts()
            .iter()
            .filter_map(|a| a.delay_before_next_ms)
            .collect();
        assert_eq!(delays.len(), 2);
        assert!((50..=100).contains(&delays[0]), "first delay {}", delays[0]);
        assert!((100..=200).contains(&delays[1]), "second delay {}", delays[1]);
        assert!(log.attempts()[2].outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_the_scheduled_delay() {
        let policy = mk_policy(3).with_jitter(JitterRange::NONE);
        let exec = RetryExecutor::new(policy).unwrap();

        let before = Instant::now();
        let out = exec
            .execute("op", || async { Err::<(), _>(refused()) })
            .await;

        assert_eq!(out.attempts, 3);
        assert_eq!(Instant::now() - before, Duration::from_millis(300));
        assert_eq!(out.elapsed, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn recorded_delays_never_decrease_in_base() {
        let policy = mk_policy(8).with_jitter(JitterRange::NONE);
        let exec = RetryExecutor::new(policy).unwrap();
        let mut log = AttemptLog::default();

        let _ = exec
            .execute_into("op", || async { Err::<(), _>(refused()) }, &mut log)
            .await;

        let delays: Vec<u64> = log
            .attempts()
            .iter()
            .filter_map(|a| a.delay_before_next_ms)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_600, 2_000, 2_000]);
        assert_eq!(log.total_delay(), Duration::from_millis(7_100));
    }

    #[test]
    fn rejects_invalid_policy() {
        let res = RetryExecutor::new(RetryPolicy::default().with_max_attempts(0));
        assert!(matches!(res, Err(CoreError::Config(_))));
    }
}
