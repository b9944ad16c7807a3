use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonically increasing sequence for run identifiers.
static RUN_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    RUN_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Build a human-readable run id recorded on the run's tracing span.
///
/// Format: `{plan}-{seq:x}`.
/// - `plan`: DegradationPlan::name()
/// - `seq` : per-process hex sequence
pub fn make_run_id(plan: &str) -> String {
    format!("{plan}-{seq:x}", seq = next_seq())
}
