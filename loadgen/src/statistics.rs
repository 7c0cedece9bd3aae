use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::RequestError;

/// Outcome of one request attempt.
///
/// `status` is only meaningful when `error` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: u16,
    pub duration: Duration,
    pub error: Option<RequestError>,
    pub response_len: usize,
}

impl RequestOutcome {
    #[must_use]
    pub fn success(status: u16, duration: Duration, response_len: usize) -> Self {
        Self {
            status,
            duration,
            error: None,
            response_len,
        }
    }

    #[must_use]
    pub fn failure(error: RequestError, duration: Duration) -> Self {
        Self {
            status: 0,
            duration,
            error: Some(error),
            response_len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Running totals over every outcome of one run.
///
/// Folding is commutative, so the final value does not depend on the order
/// outcomes arrive in. Latency figures cover successful requests only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    total_requests: u64,
    success_requests: u64,
    failed_requests: u64,
    total_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
    status_codes: BTreeMap<u16, u64>,
    failure_kinds: BTreeMap<&'static str, u64>,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self {
            total_requests: 0,
            success_requests: 0,
            failed_requests: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            status_codes: BTreeMap::new(),
            failure_kinds: BTreeMap::new(),
        }
    }
}

impl RunStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, outcome: &RequestOutcome) {
        self.total_requests += 1;
        match &outcome.error {
            Some(err) => {
                self.failed_requests += 1;
                *self.failure_kinds.entry(err.category()).or_insert(0) += 1;
            }
            None => {
                self.success_requests += 1;
                *self.status_codes.entry(outcome.status).or_insert(0) += 1;
                update_stats(
                    outcome.duration,
                    &mut self.min_duration,
                    &mut self.max_duration,
                    &mut self.total_duration,
                );
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    #[inline]
    #[must_use]
    pub fn success_requests(&self) -> u64 {
        self.success_requests
    }

    #[inline]
    #[must_use]
    pub fn failed_requests(&self) -> u64 {
        self.failed_requests
    }

    /// Sum of successful request latencies.
    #[inline]
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    #[must_use]
    pub fn min_duration(&self) -> Option<Duration> {
        (self.success_requests > 0).then_some(self.min_duration)
    }

    #[must_use]
    pub fn max_duration(&self) -> Option<Duration> {
        (self.success_requests > 0).then_some(self.max_duration)
    }

    #[inline]
    #[must_use]
    pub fn status_codes(&self) -> &BTreeMap<u16, u64> {
        &self.status_codes
    }

    /// Failed requests grouped by [`RequestError::category`].
    #[inline]
    #[must_use]
    pub fn failure_kinds(&self) -> &BTreeMap<&'static str, u64> {
        &self.failure_kinds
    }

    /// Percentage of requests that got a response, `None` before any request.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_requests == 0 {
            return None;
        }
        Some(self.success_requests as f64 / self.total_requests as f64 * 100.0)
    }

    #[must_use]
    pub fn mean_latency(&self) -> Option<Duration> {
        if self.success_requests == 0 {
            return None;
        }
        let nanos = self.total_duration.as_nanos() / u128::from(self.success_requests);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// All requests, failed ones included, per second of `wall_time`.
    #[must_use]
    pub fn qps(&self, wall_time: Duration) -> Option<f64> {
        if self.total_requests == 0 || wall_time.is_zero() {
            return None;
        }
        Some(self.total_requests as f64 / wall_time.as_secs_f64())
    }

    /// Share of successful requests that `count` represents, in percent.
    #[must_use]
    pub fn status_share(&self, count: u64) -> Option<f64> {
        if self.success_requests == 0 {
            return None;
        }
        Some(count as f64 / self.success_requests as f64 * 100.0)
    }
}

fn update_stats(cur: Duration, min: &mut Duration, max: &mut Duration, sum: &mut Duration) {
    if cur < *min {
        *min = cur;
    }
    if cur > *max {
        *max = cur;
    }
    *sum = sum.saturating_add(cur);
}

/// Single consumer of a run's outcome channel.
///
/// Each outcome is folded in one critical section, so clones handed to other
/// threads only ever observe whole updates through [`StatsAggregator::snapshot`].
#[derive(Clone, Default)]
pub struct StatsAggregator {
    stats: Arc<Mutex<RunStatistics>>,
}

impl StatsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&self, outcome: &RequestOutcome) {
        self.stats.lock().fold(outcome);
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStatistics {
        self.stats.lock().clone()
    }

    /// Folds outcomes until every sender is gone and the buffer is empty.
    pub async fn drain(&self, mut results: mpsc::Receiver<RequestOutcome>) -> RunStatistics {
        while let Some(outcome) = results.recv().await {
            self.record(&outcome);
        }
        self.snapshot()
    }
}
