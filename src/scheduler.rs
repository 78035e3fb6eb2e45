// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::time::MissedTickBehavior;

use crate::error::RunError;
use crate::run::{RunReport, Runner};

/// One feed wired for repeated runs.
#[derive(Clone)]
pub struct FeedJob {
    pub name: String,
    pub url: Url,
    pub runner: Arc<Runner>,
}

/// Run every job once, in order. One feed failing does not stop the others.
pub async fn run_all_once(
    jobs: &[FeedJob],
    dry_run: bool,
) -> Vec<(String, Result<RunReport, RunError>)> {
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        let res = job.runner.run_once(&job.name, &job.url, dry_run).await;
        if let Err(e) = &res {
            tracing::error!(feed = %job.name, error = %e, "run failed");
        }
        results.push((job.name.clone(), res));
    }
    results
}

/// Fixed-interval loop over `jobs` until `shutdown` resolves. Errors are logged and the
/// loop keeps going. Returns the number of completed ticks.
pub async fn run_every<F>(jobs: Vec<FeedJob>, every: Duration, dry_run: bool, shutdown: F) -> u64
where
    F: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            // shutdown first: a pending stop wins over a due tick
            biased;
            _ = &mut shutdown => {
                tracing::info!(ticks, "scheduler stopping");
                return ticks;
            }
            _ = ticker.tick() => {
                let results = run_all_once(&jobs, dry_run).await;
                ticks += 1;
                let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                tracing::info!(
                    feeds = results.len(),
                    failed,
                    next_in_secs = every.as_secs(),
                    "scheduled tick"
                );
            }
        }
    }
}
