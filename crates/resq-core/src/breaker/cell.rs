use std::time::Duration;

use resq_model::CircuitState;
use tokio::time::Instant;

/// Runtime thresholds derived from a [`resq_model::BreakerPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub success_threshold: u32,
    pub half_open_max_calls: u32,
}

/// Proof of admission, stamped with the circuit generation it was issued in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub generation: u64,
    pub admitted_in: CircuitState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    Admitted(Ticket),
    Rejected { retry_after: Option<Duration> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// State and counters of one circuit.
///
/// Every method is a complete read-modify-write; the owner keeps the cell behind a mutex
/// so each call is one atomic step per key. `generation` increments on every transition:
/// outcomes carrying an older generation belong to calls admitted before the transition
/// and are ignored.
#[derive(Debug, Default)]
pub(crate) struct CircuitCell {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
    pub half_open_in_flight: u32,
    pub opened_at: Option<Instant>,
    pub generation: u64,
}

impl CircuitCell {
    pub fn admit(&mut self, s: &BreakerSettings, now: Instant) -> (Admission, Option<Transition>) {
        let mut transition = None;

        if self.state == CircuitState::Open {
            let waited = self
                .opened_at
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or(s.reset_timeout);
            if waited < s.reset_timeout {
                let retry_after = Some(s.reset_timeout - waited);
                return (Admission::Rejected { retry_after }, None);
            }
            transition = Some(self.move_to(CircuitState::HalfOpen, now));
        }

        let admission = match self.state {
            CircuitState::Closed => Admission::Admitted(self.ticket()),
            CircuitState::HalfOpen if self.half_open_in_flight < s.half_open_max_calls => {
                self.half_open_in_flight += 1;
                Admission::Admitted(self.ticket())
            }
            _ => Admission::Rejected { retry_after: None },
        };
        (admission, transition)
    }

    pub fn on_success(
        &mut self,
        t: Ticket,
        s: &BreakerSettings,
        now: Instant,
    ) -> Option<Transition> {
        if t.generation != self.generation {
            return None;
        }
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
                None
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
                self.half_open_successes += 1;
                (self.half_open_successes >= s.success_threshold)
                    .then(|| self.move_to(CircuitState::Closed, now))
            }
            CircuitState::Open => None,
        }
    }

    pub fn on_failure(
        &mut self,
        t: Ticket,
        s: &BreakerSettings,
        now: Instant,
    ) -> Option<Transition> {
        if t.generation != self.generation {
            return None;
        }
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                (self.consecutive_failures >= s.failure_threshold)
                    .then(|| self.move_to(CircuitState::Open, now))
            }
            CircuitState::HalfOpen => Some(self.move_to(CircuitState::Open, now)),
            CircuitState::Open => None,
        }
    }

    /// Give back a half-open trial slot whose call ended without an outcome.
    pub fn release(&mut self, t: Ticket) {
        if t.generation == self.generation
            && t.admitted_in == CircuitState::HalfOpen
            && self.state == CircuitState::HalfOpen
        {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
    }

    pub fn reset(&mut self) -> Option<Transition> {
        let from = self.state;
        *self = CircuitCell {
            generation: self.generation + 1,
            ..CircuitCell::default()
        };
        (from != CircuitState::Closed).then_some(Transition {
            from,
            to: CircuitState::Closed,
        })
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            admitted_in: self.state,
        }
    }

    fn move_to(&mut self, to: CircuitState, now: Instant) -> Transition {
        let from = self.state;
        self.state = to;
        self.generation += 1;
        self.half_open_successes = 0;
        self.half_open_in_flight = 0;

        match to {
            CircuitState::Open => self.opened_at = Some(now),
            CircuitState::Closed => {
                self.consecutive_failures = 0;
                self.opened_at = None;
            }
            CircuitState::HalfOpen => {}
        }
        Transition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_settings() -> BreakerSettings {
        BreakerSettings {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(60),
            success_threshold: 2,
            half_open_max_calls: 2,
        }
    }

    fn admitted(a: Admission) -> Ticket {
        match a {
            Admission::Admitted(t) => t,
            other => panic!("expected admission, got {other:?}"),
        }
    }

    fn open_cell(s: &BreakerSettings, now: Instant) -> CircuitCell {
        let mut cell = CircuitCell::default();
        for _ in 0..s.failure_threshold {
            let t = admitted(cell.admit(s, now).0);
            cell.on_failure(t, s, now);
        }
        assert_eq!(cell.state, CircuitState::Open);
        cell
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = CircuitCell::default();

        for i in 1..s.failure_threshold {
            let t = admitted(cell.admit(&s, now).0);
            assert_eq!(cell.on_failure(t, &s, now), None, "opened too early at {i}");
        }
        let t = admitted(cell.admit(&s, now).0);
        let tr = cell.on_failure(t, &s, now);
        assert_eq!(
            tr,
            Some(Transition {
                from: CircuitState::Closed,
                to: CircuitState::Open
            })
        );
        assert_eq!(cell.opened_at, Some(now));
    }

    #[test]
    fn success_resets_consecutive_count() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = CircuitCell::default();

        for _ in 0..2 {
            let t = admitted(cell.admit(&s, now).0);
            cell.on_failure(t, &s, now);
        }
        let t = admitted(cell.admit(&s, now).0);
        cell.on_success(t, &s, now);
        assert_eq!(cell.consecutive_failures, 0);

        for _ in 0..2 {
            let t = admitted(cell.admit(&s, now).0);
            cell.on_failure(t, &s, now);
        }
        assert_eq!(cell.state, CircuitState::Closed);
    }

    #[test]
    fn open_rejects_until_reset_timeout_then_half_opens_lazily() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = open_cell(&s, now);

        let later = now + Duration::from_secs(59);
        match cell.admit(&s, later) {
            (Admission::Rejected { retry_after }, None) => {
                assert_eq!(retry_after, Some(Duration::from_secs(1)));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(cell.state, CircuitState::Open);

        let (a, tr) = cell.admit(&s, now + s.reset_timeout);
        let t = admitted(a);
        assert_eq!(t.admitted_in, CircuitState::HalfOpen);
        assert_eq!(tr.map(|t| t.to), Some(CircuitState::HalfOpen));
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = open_cell(&s, now);
        let then = now + s.reset_timeout;

        let t1 = admitted(cell.admit(&s, then).0);
        assert_eq!(cell.on_success(t1, &s, then), None);
        let t2 = admitted(cell.admit(&s, then).0);
        let tr = cell.on_success(t2, &s, then);

        assert_eq!(tr.map(|t| t.to), Some(CircuitState::Closed));
        assert_eq!(cell.consecutive_failures, 0);
        assert_eq!(cell.half_open_successes, 0);
        assert_eq!(cell.opened_at, None);
    }

    #[test]
    fn single_half_open_failure_reopens() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = open_cell(&s, now);
        let then = now + s.reset_timeout;

        let t1 = admitted(cell.admit(&s, then).0);
        cell.on_success(t1, &s, then);
        let t2 = admitted(cell.admit(&s, then).0);
        let tr = cell.on_failure(t2, &s, then);

        assert_eq!(tr.map(|t| t.to), Some(CircuitState::Open));
        assert_eq!(cell.opened_at, Some(then));
    }

    #[test]
    fn half_open_bounds_concurrent_trials() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = open_cell(&s, now);
        let then = now + s.reset_timeout;

        let t1 = admitted(cell.admit(&s, then).0);
        let _t2 = admitted(cell.admit(&s, then).0);
        assert!(matches!(
            cell.admit(&s, then).0,
            Admission::Rejected { retry_after: None }
        ));

        cell.release(t1);
        assert!(matches!(cell.admit(&s, then).0, Admission::Admitted(_)));
    }

    #[test]
    fn stale_outcomes_are_ignored() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = CircuitCell::default();

        let tickets: Vec<Ticket> = (0..5).map(|_| admitted(cell.admit(&s, now).0)).collect();
        let transitions: Vec<_> = tickets
            .into_iter()
            .filter_map(|t| cell.on_failure(t, &s, now))
            .collect();

        assert_eq!(transitions.len(), 1, "circuit must open exactly once");
        assert_eq!(cell.state, CircuitState::Open);
        assert_eq!(cell.consecutive_failures, 3);
    }

    #[test]
    fn reset_returns_to_closed() {
        let s = mk_settings();
        let now = Instant::now();
        let mut cell = open_cell(&s, now);

        assert_eq!(cell.reset().map(|t| t.to), Some(CircuitState::Closed));
        assert_eq!(cell.state, CircuitState::Closed);
        assert_eq!(cell.reset(), None);
    }
}
