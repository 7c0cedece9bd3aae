//! Work partitioning, worker tasks and the single-target pipeline.

use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::client::HttpClient;
use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::report::{Report, ReportSummary};
use crate::statistics::{RequestOutcome, RunStatistics, StatsAggregator};

/// Outcome channel slots per worker.
pub const CHANNEL_CAPACITY_PER_WORKER: usize = 10;
/// Upper bound on outcome channel slots, however many workers run.
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 16;

/// Statistics of a finished run and how long it took end to end.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub statistics: RunStatistics,
    pub wall_time: Duration,
}

#[derive(Debug, Clone)]
pub struct TargetReport {
    pub url: String,
    pub outcome: RunOutcome,
}

impl TargetReport {
    #[must_use]
    pub fn report(&self) -> Report<'_> {
        Report::new(&self.url, &self.outcome.statistics, self.outcome.wall_time)
    }

    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::new(&self.url, &self.outcome.statistics, self.outcome.wall_time)
    }
}

/// Splits `total_requests` over `concurrency` workers. The first
/// `total_requests % concurrency` workers take one extra request.
#[must_use]
pub fn partition(total_requests: usize, concurrency: usize) -> Vec<usize> {
    if concurrency == 0 {
        return Vec::new();
    }
    let base = total_requests / concurrency;
    let extra = total_requests % concurrency;
    (0..concurrency)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Buffer size of the outcome channel for `concurrency` workers.
#[must_use]
pub fn channel_capacity(concurrency: usize) -> usize {
    concurrency
        .saturating_mul(CHANNEL_CAPACITY_PER_WORKER)
        .clamp(1, MAX_CHANNEL_CAPACITY)
}

/// Runs every target concurrently, each through its own isolated pipeline.
/// Reports come back in the order the targets were given.
pub async fn run_targets(configs: Vec<RunConfig>) -> anyhow::Result<Vec<TargetReport>> {
    let mut tasks = Vec::with_capacity(configs.len());
    for config in configs {
        let span = tracing::info_span!("target", url = %config.url());
        tasks.push(tokio::spawn(
            async move {
                let outcome = run(&config).await?;
                Ok::<_, ConfigError>(TargetReport {
                    url: config.url().to_string(),
                    outcome,
                })
            }
            .instrument(span),
        ));
    }
    let mut reports = Vec::with_capacity(tasks.len());
    for t in tasks {
        let report = t.await.context("Failed to join target pipeline")??;
        reports.push(report);
    }
    Ok(reports)
}

/// Runs one target to completion with a fresh client.
pub async fn run(config: &RunConfig) -> Result<RunOutcome, ConfigError> {
    config.validate()?;
    Ok(run_with_client(config, HttpClient::for_config(config)).await)
}

/// Runs one target to completion, sharing `client`'s connection pool between
/// all workers.
pub async fn run_with_client(config: &RunConfig, client: HttpClient) -> RunOutcome {
    let counts = partition(config.total_requests(), config.concurrency());
    let (results_tx, results_rx) = mpsc::channel(channel_capacity(config.concurrency()));
    tracing::info!(
        concurrency = config.concurrency(),
        total_requests = config.total_requests(),
        timeout = ?config.timeout(),
        "starting load test"
    );

    let start = Instant::now();
    let mut workers = JoinSet::new();
    for (id, count) in counts.into_iter().enumerate() {
        workers.spawn(run_worker(id, client.clone(), count, results_tx.clone()).in_current_span());
    }
    tokio::spawn(watch_completion(workers, results_tx).in_current_span());

    let statistics = StatsAggregator::new().drain(results_rx).await;
    let wall_time = start.elapsed();
    tracing::info!(
        total = statistics.total_requests(),
        success = statistics.success_requests(),
        failed = statistics.failed_requests(),
        ?wall_time,
        "load test finished"
    );
    RunOutcome {
        statistics,
        wall_time,
    }
}

/// Sends `count` requests one after another, pushing every outcome to
/// `results`. Returns how many outcomes were delivered.
pub async fn run_worker(
    id: usize,
    client: HttpClient,
    count: usize,
    results: mpsc::Sender<RequestOutcome>,
) -> usize {
    let mut sent = 0;
    for _ in 0..count {
        let outcome = client.execute().await;
        if results.send(outcome).await.is_err() {
            tracing::debug!(worker = id, "result channel closed, stopping early");
            break;
        }
        sent += 1;
    }
    tracing::debug!(worker = id, sent, "worker finished");
    sent
}

/// Waits for every worker, then drops the last sender so the aggregator's
/// drain loop ends.
async fn watch_completion(mut workers: JoinSet<usize>, results: mpsc::Sender<RequestOutcome>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "worker task failed");
        }
    }
    drop(results);
}
