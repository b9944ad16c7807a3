//! Runs a two-stage search cascade against simulated flaky backends and prints one
//! JSON outcome report per request.
//!
//! Usage: `resq-probe [config.json]`
mod config;
mod sim;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::Context;
use tracing::info;

use resq_core::{DegradationCoordinator, DegradationPlan, PlanContext};
use resq_model::{STAGE_KEYWORD_SEARCH, STAGE_VECTOR_SEARCH};
use resq_observe::{LoggerTimeZone, init_local_offset, init_logger};
use resq_prometheus::PrometheusMetrics;

use crate::config::ProbeConfig;

fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = ProbeConfig::load(path.as_deref())?;

    // Offset detection must happen before the runtime spawns threads.
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building runtime")?
        .block_on(run(cfg))
}

async fn run(cfg: ProbeConfig) -> anyhow::Result<()> {
    // 1) logger
    let logger = cfg.logger.clone().with_env_overrides()?;
    init_logger(&logger)?;
    info!(plan = %cfg.plan.name, requests = cfg.requests, "probe starting");

    // 2) metrics + shared circuits
    let metrics = PrometheusMetrics::new()?;
    let ctx = PlanContext::default().with_metrics(Arc::new(metrics.clone()));

    // 3) plan
    let operations = HashMap::from([
        (
            STAGE_VECTOR_SEARCH.to_string(),
            sim::simulated(STAGE_VECTOR_SEARCH, cfg.vector.clone()),
        ),
        (
            STAGE_KEYWORD_SEARCH.to_string(),
            sim::simulated(STAGE_KEYWORD_SEARCH, cfg.keyword.clone()),
        ),
    ]);
    let plan = DegradationPlan::from_spec(&cfg.plan, operations, &ctx)?;
    let coordinator = DegradationCoordinator::new(plan);

    // 4) concurrent requests
    let handles: Vec<_> = (0..cfg.requests)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run(&format!("query-{i}")).await })
        })
        .collect();

    for handle in handles {
        let report = handle.await.context("request task panicked")?;
        println!("{}", serde_json::to_string(&report)?);
    }

    // 5) circuits + metrics
    println!("{}", serde_json::to_string(&ctx.registry().snapshot())?);
    if cfg.print_metrics {
        print!("{}", metrics.encode_text()?);
    }
    Ok(())
}
