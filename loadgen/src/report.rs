//! Rendering of finished runs, as text for people and JSON for tools.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::statistics::RunStatistics;

/// Shown in place of a metric whose divisor is zero.
pub const NOT_AVAILABLE: &str = "N/A";

const RULE_WIDTH: usize = 60;

/// Text report for one target. Rendering is pure: the same inputs always give
/// the same text.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    url: &'a str,
    statistics: &'a RunStatistics,
    wall_time: Duration,
}

impl<'a> Report<'a> {
    #[must_use]
    pub fn new(url: &'a str, statistics: &'a RunStatistics, wall_time: Duration) -> Self {
        Self {
            url,
            statistics,
            wall_time,
        }
    }
}

#[must_use]
pub fn render(url: &str, statistics: &RunStatistics, wall_time: Duration) -> String {
    Report::new(url, statistics, wall_time).to_string()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.statistics;
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "HTTP load test results")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Target URL:           {}", self.url)?;
        writeln!(f, "Total requests:       {}", stats.total_requests())?;
        writeln!(f, "Successful requests:  {}", stats.success_requests())?;
        writeln!(f, "Failed requests:      {}", stats.failed_requests())?;
        writeln!(f, "Success rate:         {}", percent(stats.success_rate(), 2))?;
        writeln!(f, "Total time:           {:?}", self.wall_time)?;
        writeln!(f, "Mean latency:         {}", latency(stats.mean_latency()))?;
        writeln!(f, "Fastest request:      {}", latency(stats.min_duration()))?;
        writeln!(f, "Slowest request:      {}", latency(stats.max_duration()))?;
        writeln!(f, "QPS:                  {}", number(stats.qps(self.wall_time), 2))?;
        writeln!(f)?;
        writeln!(f, "Status codes:")?;
        if stats.status_codes().is_empty() {
            writeln!(f, "  (none)")?;
        }
        for (code, count) in stats.status_codes() {
            writeln!(
                f,
                "  {code}: {count} ({})",
                percent(stats.status_share(*count), 1)
            )?;
        }
        if !stats.failure_kinds().is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for (kind, count) in stats.failure_kinds() {
                writeln!(f, "  {kind}: {count}")?;
            }
        }
        write!(f, "{rule}")
    }
}

fn percent(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |v| format!("{v:.precision$}%"),
    )
}

fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.precision$}"))
}

fn latency(value: Option<Duration>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |d| format!("{d:?}"))
}

/// Machine readable form of a [`Report`]. Latencies are in milliseconds;
/// metrics that cannot be computed are `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub url: String,
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub success_rate_percent: Option<f64>,
    pub wall_time_ms: f64,
    pub mean_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub qps: Option<f64>,
    pub status_codes: BTreeMap<u16, StatusShare>,
    pub failures: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusShare {
    pub count: u64,
    pub percent: Option<f64>,
}

impl ReportSummary {
    #[must_use]
    pub fn new(url: &str, statistics: &RunStatistics, wall_time: Duration) -> Self {
        let status_codes = statistics
            .status_codes()
            .iter()
            .map(|(code, count)| {
                let share = StatusShare {
                    count: *count,
                    percent: statistics.status_share(*count),
                };
                (*code, share)
            })
            .collect();
        Self {
            url: url.to_string(),
            total_requests: statistics.total_requests(),
            success_requests: statistics.success_requests(),
            failed_requests: statistics.failed_requests(),
            success_rate_percent: statistics.success_rate(),
            wall_time_ms: millis(wall_time),
            mean_latency_ms: statistics.mean_latency().map(millis),
            min_latency_ms: statistics.min_duration().map(millis),
            max_latency_ms: statistics.max_duration().map(millis),
            qps: statistics.qps(wall_time),
            status_codes,
            failures: statistics.failure_kinds().clone(),
        }
    }
}

#[inline]
fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::statistics::RequestOutcome;

    const URL: &str = "http://dev.web.test:30080/";

    fn stats_of(outcomes: &[RequestOutcome]) -> RunStatistics {
        let mut stats = RunStatistics::new();
        for outcome in outcomes {
            stats.fold(outcome);
        }
        stats
    }

    #[test]
    fn renders_every_metric() {
        let stats = stats_of(&[
            RequestOutcome::success(200, Duration::from_millis(10), 5),
            RequestOutcome::success(200, Duration::from_millis(30), 5),
            RequestOutcome::success(503, Duration::from_millis(20), 0),
            RequestOutcome::failure(RequestError::Timeout, Duration::from_secs(1)),
        ]);
        let text = render(URL, &stats, Duration::from_secs(2));

        assert!(text.contains("Target URL:           http://dev.web.test:30080/"));
        assert!(text.contains("Total requests:       4"));
        assert!(text.contains("Successful requests:  3"));
        assert!(text.contains("Failed requests:      1"));
        assert!(text.contains("Success rate:         75.00%"));
        assert!(text.contains("Total time:           2s"));
        assert!(text.contains("Mean latency:         20ms"));
        assert!(text.contains("Fastest request:      10ms"));
        assert!(text.contains("Slowest request:      30ms"));
        assert!(text.contains("QPS:                  2.00"));
        assert!(text.contains("  200: 2 (66.7%)"));
        assert!(text.contains("  503: 1 (33.3%)"));
        assert!(text.contains("  timeout: 1"));
        assert!(text.find("200:").unwrap() < text.find("503:").unwrap());
    }

    #[test]
    fn empty_run_renders_sentinels() {
        let stats = RunStatistics::new();
        let text = render(URL, &stats, Duration::ZERO);
        assert!(text.contains("Success rate:         N/A"));
        assert!(text.contains("Mean latency:         N/A"));
        assert!(text.contains("Fastest request:      N/A"));
        assert!(text.contains("QPS:                  N/A"));
        assert!(text.contains("  (none)"));
        assert!(!text.contains("Failures:"));
    }

    #[test]
    fn all_failed_run_renders_without_latency() {
        let stats = stats_of(&[
            RequestOutcome::failure(RequestError::Timeout, Duration::from_millis(100)),
            RequestOutcome::failure(
                RequestError::Connect {
                    message: "refused".to_string(),
                },
                Duration::from_millis(1),
            ),
        ]);
        let text = render(URL, &stats, Duration::from_secs(1));
        assert!(text.contains("Success rate:         0.00%"));
        assert!(text.contains("Mean latency:         N/A"));
        assert!(text.contains("Slowest request:      N/A"));
        assert!(text.contains("QPS:                  2.00"));
        assert!(text.contains("  connect: 1"));
    }

    #[test]
    fn summary_mirrors_statistics() {
        let stats = stats_of(&[
            RequestOutcome::success(200, Duration::from_millis(50), 12),
            RequestOutcome::failure(RequestError::Timeout, Duration::from_millis(10)),
        ]);
        let summary = ReportSummary::new(URL, &stats, Duration::from_secs(1));
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.success_rate_percent, Some(50.0));
        assert_eq!(summary.mean_latency_ms, Some(50.0));
        assert_eq!(summary.qps, Some(2.0));
        assert_eq!(
            summary.status_codes[&200],
            StatusShare {
                count: 1,
                percent: Some(100.0)
            }
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status_codes"]["200"]["count"], 1);
        assert_eq!(json["failures"]["timeout"], 1);
    }

    #[test]
    fn summary_of_empty_run_uses_null() {
        let summary = ReportSummary::new(URL, &RunStatistics::new(), Duration::ZERO);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["mean_latency_ms"].is_null());
        assert!(json["success_rate_percent"].is_null());
        assert!(json["qps"].is_null());
    }
}
