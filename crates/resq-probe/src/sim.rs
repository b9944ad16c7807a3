use std::time::Duration;

use rand::Rng;
use resq_core::{BackendError, OperationFn, OperationRef};

use crate::config::BackendSim;

/// Backend that answers after a random latency and fails at the configured rates.
pub fn simulated(stage: &'static str, sim: BackendSim) -> OperationRef<String, Vec<String>> {
    OperationFn::arc(move |query: String| {
        let sim = sim.clone();
        async move {
            let (latency, roll) = {
                let mut rng = rand::rng();
                let lo = sim.min_latency_ms.min(sim.max_latency_ms);
                (
                    rng.random_range(lo..=sim.max_latency_ms),
                    rng.random::<f64>(),
                )
            };
            tokio::time::sleep(Duration::from_millis(latency)).await;

            if roll < sim.failure_rate {
                return Err(BackendError::ConnectionRefused(format!(
                    "{stage}: ECONNREFUSED"
                )));
            }
            if roll < sim.failure_rate + sim.invalid_rate {
                return Err(BackendError::InvalidQuery(format!(
                    "{stage}: syntax error near {query:?}"
                )));
            }
            Ok(vec![format!("{stage}:{query}:1"), format!("{stage}:{query}:2")])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_failing_backend_refuses() {
        let op = simulated(
            "vector-search",
            BackendSim {
                failure_rate: 1.0,
                min_latency_ms: 0,
                max_latency_ms: 0,
                ..BackendSim::default()
            },
        );
        let err = op.call(&"rust".to_string()).await.unwrap_err();
        assert!(matches!(err, BackendError::ConnectionRefused(_)));
    }

    #[tokio::test]
    async fn healthy_backend_returns_hits() {
        let op = simulated(
            "keyword-search",
            BackendSim {
                min_latency_ms: 0,
                max_latency_ms: 0,
                ..BackendSim::default()
            },
        );
        let hits = op.call(&"rust".to_string()).await.unwrap();
        assert_eq!(hits, ["keyword-search:rust:1", "keyword-search:rust:2"]);
    }
}
