use std::{collections::BTreeMap, future, time::Duration};

use resq_model::{
    Classification, ClassificationKind, OutcomeReport, StageDiagnostic, StageName,
};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, instrument, warn};

use super::{DegradationPlan, DegradationStage, id::make_run_id};
use crate::{
    metrics::{MetricsHandle, RunOutcome, StageOutcome},
    retry::AttemptLog,
};

/// Per-run controls layered over the plan's own deadline.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Absolute deadline; the earlier of this and the plan deadline applies.
    pub deadline: Option<Instant>,
    /// Stops the run like a deadline, reported as `Cancelled`.
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Walks a [`DegradationPlan`] for each request.
///
/// Holds no per-request state; one coordinator serves any number of concurrent runs.
pub struct DegradationCoordinator<Req, T> {
    plan: DegradationPlan<Req, T>,
    metrics: MetricsHandle,
}

/// How the walk ended when it ran to completion.
enum Walked<T> {
    Succeeded { index: usize, value: T },
    Fatal(Classification),
    Exhausted(Classification),
}

/// Why the run stopped.
enum Stop<T> {
    Walked(Walked<T>),
    Timeout,
    Cancelled,
}

/// Everything recorded so far. Lives outside the walk future so it survives a deadline.
#[derive(Default)]
struct Trail {
    attempts: BTreeMap<StageName, u32>,
    diagnostics: Vec<StageDiagnostic>,
    in_flight: Option<(usize, Instant)>,
    log: AttemptLog,
}

impl Trail {
    fn enter(&mut self, index: usize) {
        self.in_flight = Some((index, Instant::now()));
        self.log.clear();
    }
}

impl<Req, T> DegradationCoordinator<Req, T>
where
    Req: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(plan: DegradationPlan<Req, T>) -> Self {
        let metrics = plan.context().metrics().clone();
        Self { plan, metrics }
    }

    pub fn plan(&self) -> &DegradationPlan<Req, T> {
        &self.plan
    }

    /// Run the cascade for `request` under the plan's deadline.
    pub async fn run(&self, request: &Req) -> OutcomeReport<T> {
        self.run_with(request, RunOptions::default()).await
    }

    /// Run the cascade for `request`.
    ///
    /// Never fails: exhaustion, fatal errors, deadline and cancellation are all reported
    /// through [`OutcomeReport::terminal_error`].
    #[instrument(
        name = "degrade.run",
        level = "debug",
        skip_all,
        fields(plan = %self.plan.name(), run_id = tracing::field::Empty)
    )]
    pub async fn run_with(&self, request: &Req, opts: RunOptions) -> OutcomeReport<T> {
        Span::current().record("run_id", make_run_id(self.plan.name()).as_str());

        let started = Instant::now();
        let deadline = match (opts.deadline, self.plan.deadline().map(|d| started + d)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let mut trail = Trail::default();
        let stop = {
            let walk = self.walk(request, &mut trail);
            tokio::select! {
                biased;
                _ = cancelled(opts.cancel.as_ref()) => Stop::Cancelled,
                _ = expired(deadline) => Stop::Timeout,
                walked = walk => Stop::Walked(walked),
            }
        };

        let (report, outcome) = self.finish(stop, trail, started);
        self.metrics
            .record_run_completed(self.plan.name(), outcome, report.total_elapsed_ms);
        report
    }

    async fn walk(&self, request: &Req, trail: &mut Trail) -> Walked<T> {
        let stages = self.plan.stages();
        let mut last = None;

        for (index, stage) in stages.iter().enumerate() {
            trail.enter(index);
            let result = stage.call(request, &mut trail.log).await;

            match result {
                Ok(value) => {
                    self.leave(trail, stage, None, false);
                    return Walked::Succeeded { index, value };
                }
                Err(err) => {
                    self.leave(trail, stage, Some(err.clone()), false);
                    if err.is_fatal() {
                        return Walked::Fatal(err);
                    }
                    if let Some(next) = stages.get(index + 1) {
                        debug!(
                            stage = stage.name(),
                            next = next.name(),
                            kind = %err.kind,
                            "stage failed; advancing"
                        );
                    }
                    last = Some(err);
                }
            }
        }

        Walked::Exhausted(last.unwrap_or_else(|| Classification::unclassified("plan has no stages")))
    }

    /// Close the in-flight stage and append its diagnostic.
    fn leave(
        &self,
        trail: &mut Trail,
        stage: &DegradationStage<Req, T>,
        error: Option<Classification>,
        interrupted: bool,
    ) {
        let Some((_, entered)) = trail.in_flight.take() else {
            return;
        };
        let attempts = trail.log.started();
        let elapsed_ms = entered.elapsed().as_millis() as u64;
        let fast_failed = attempts == 0
            && error
                .as_ref()
                .is_some_and(|e| e.kind == ClassificationKind::CircuitOpen);

        let outcome = match (&error, fast_failed, interrupted) {
            (_, _, true) => StageOutcome::Interrupted,
            (None, _, _) => StageOutcome::Success,
            (Some(_), true, _) => StageOutcome::FastFail,
            (Some(_), false, _) => StageOutcome::Failure,
        };
        self.metrics
            .record_stage_completed(stage.name(), outcome, elapsed_ms);

        trail.attempts.insert(stage.name().to_string(), attempts);
        trail.diagnostics.push(StageDiagnostic {
            stage: stage.name().to_string(),
            attempts,
            elapsed_ms,
            fast_failed,
            error,
        });
    }

    fn finish(&self, stop: Stop<T>, mut trail: Trail, started: Instant) -> (OutcomeReport<T>, RunOutcome) {
        let plan = self.plan.name();
        let mut succeeded_at_stage = None;
        let mut result = None;
        let mut degraded = true;

        let (terminal_error, outcome) = match stop {
            Stop::Walked(Walked::Succeeded { index, value }) => {
                let stage = self.plan.stages()[index].name();
                degraded = index > 0;
                if degraded {
                    info!(plan, stage, "answered by fallback stage");
                }
                succeeded_at_stage = Some(stage.to_string());
                result = Some(value);
                let outcome = if degraded {
                    RunOutcome::Degraded
                } else {
                    RunOutcome::Primary
                };
                (None, outcome)
            }
            Stop::Walked(Walked::Fatal(err)) => {
                warn!(plan, reason = %err, "fatal error; abandoning remaining stages");
                (Some(err), RunOutcome::Fatal)
            }
            Stop::Walked(Walked::Exhausted(err)) => {
                warn!(plan, reason = %err, "all stages failed");
                (Some(err), RunOutcome::Exhausted)
            }
            Stop::Timeout => {
                let err = Classification::timeout(started.elapsed());
                warn!(plan, reason = %err, "deadline exceeded");
                self.interrupt(&mut trail, &err);
                (Some(err), RunOutcome::Timeout)
            }
            Stop::Cancelled => {
                let err = Classification::cancelled();
                warn!(plan, "run cancelled");
                self.interrupt(&mut trail, &err);
                (Some(err), RunOutcome::Cancelled)
            }
        };

        let report = OutcomeReport {
            succeeded_at_stage,
            result,
            attempts_per_stage: trail.attempts,
            total_elapsed_ms: started.elapsed().as_millis() as u64,
            degraded,
            terminal_error,
            diagnostics: trail.diagnostics,
        };
        (report, outcome)
    }

    fn interrupt(&self, trail: &mut Trail, err: &Classification) {
        if let Some((index, _)) = trail.in_flight {
            let stage = &self.plan.stages()[index];
            self.leave(trail, stage, Some(err.clone()), true);
        }
    }
}

impl<Req, T> Clone for DegradationCoordinator<Req, T> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<Req, T> std::fmt::Debug for DegradationCoordinator<Req, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationCoordinator")
            .field("plan", &self.plan)
            .finish()
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => future::pending().await,
    }
}
