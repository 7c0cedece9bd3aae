//! Concurrent HTTP load generation.
//!
//! A run splits a fixed number of GET requests over a pool of workers
//! ([`scenario::partition`]), each issuing its share sequentially through a
//! shared [`client::HttpClient`]. Outcomes flow through a bounded channel into
//! a [`statistics::StatsAggregator`], and the finished
//! [`statistics::RunStatistics`] are rendered by [`report`].

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod scenario;
pub mod statistics;

pub use crate::config::RunConfig;
pub use crate::error::{ConfigError, RequestError};
pub use crate::scenario::{run, run_targets, RunOutcome, TargetReport};
pub use crate::statistics::{RequestOutcome, RunStatistics, StatsAggregator};
