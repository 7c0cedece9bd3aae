//! Property-based tests for partitioning and aggregation invariants.

use std::time::Duration;

use loadgen::report::render;
use loadgen::scenario::partition;
use loadgen::{RequestError, RequestOutcome, RunStatistics};
use proptest::prelude::*;

fn outcome() -> impl Strategy<Value = RequestOutcome> {
    let success = (
        prop::sample::select(vec![200u16, 201, 204, 301, 404, 500, 503]),
        0u64..5_000,
        0usize..65_536,
    )
        .prop_map(|(status, ms, len)| {
            RequestOutcome::success(status, Duration::from_millis(ms), len)
        });
    let failure = (
        prop_oneof![
            Just(RequestError::Timeout),
            Just(RequestError::Connect {
                message: "connection refused".to_string()
            }),
            Just(RequestError::Request {
                message: "connection closed before message completed".to_string()
            }),
        ],
        0u64..10_000,
    )
        .prop_map(|(err, ms)| RequestOutcome::failure(err, Duration::from_millis(ms)));
    prop_oneof![3 => success, 1 => failure]
}

fn fold_all(outcomes: &[RequestOutcome]) -> RunStatistics {
    let mut stats = RunStatistics::new();
    for outcome in outcomes {
        stats.fold(outcome);
    }
    stats
}

proptest! {
    /// Per-worker counts add up to the total and differ by at most one.
    #[test]
    fn partition_is_exact_and_balanced(
        total in 0usize..100_000,
        concurrency in 1usize..512,
    ) {
        let counts = partition(total, concurrency);
        prop_assert_eq!(counts.len(), concurrency);
        prop_assert_eq!(counts.iter().sum::<usize>(), total);
        let max = *counts.iter().max().unwrap();
        let min = *counts.iter().min().unwrap();
        prop_assert!(max - min <= 1);
        // Larger shares come first.
        prop_assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Count invariants hold after every single fold, not just at the end.
    #[test]
    fn counts_consistent_after_every_fold(
        outcomes in prop::collection::vec(outcome(), 0..300),
    ) {
        let mut stats = RunStatistics::new();
        for outcome in &outcomes {
            stats.fold(outcome);
            prop_assert_eq!(
                stats.total_requests(),
                stats.success_requests() + stats.failed_requests()
            );
            prop_assert_eq!(
                stats.success_requests(),
                stats.status_codes().values().sum::<u64>()
            );
            prop_assert_eq!(
                stats.failed_requests(),
                stats.failure_kinds().values().sum::<u64>()
            );
            if stats.success_requests() > 0 {
                prop_assert!(stats.min_duration() <= stats.max_duration());
                let mean = stats.mean_latency().unwrap();
                prop_assert!(stats.min_duration().unwrap() <= mean);
                prop_assert!(mean <= stats.max_duration().unwrap());
            }
        }
        prop_assert_eq!(stats.total_requests(), outcomes.len() as u64);
    }

    /// Arrival order does not change the final statistics.
    #[test]
    fn aggregation_is_order_independent(
        (outcomes, shuffled) in prop::collection::vec(outcome(), 0..200)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        prop_assert_eq!(fold_all(&outcomes), fold_all(&shuffled));
    }

    /// Rendering twice gives identical text, and never panics on empty
    /// or all-failed runs.
    #[test]
    fn render_is_idempotent(
        outcomes in prop::collection::vec(outcome(), 0..100),
        wall_ms in 0u64..60_000,
    ) {
        let stats = fold_all(&outcomes);
        let wall = Duration::from_millis(wall_ms);
        let first = render("http://127.0.0.1:8080/", &stats, wall);
        let second = render("http://127.0.0.1:8080/", &stats, wall);
        prop_assert_eq!(first, second);
    }
}
