//! Run parameters and the command line surface that produces them.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use http::Uri;

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogEnv};

/// Parameters of one single-target run. Validated on construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    url: String,
    uri: Uri,
    concurrency: usize,
    total_requests: usize,
    timeout: Duration,
}

impl RunConfig {
    pub fn new<U: Into<String>>(
        url: U,
        concurrency: usize,
        total_requests: usize,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        let uri: Uri = url.parse().map_err(|source| ConfigError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        let config = Self {
            url,
            uri,
            concurrency,
            total_requests,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.total_requests == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.uri.scheme_str() != Some("http") || self.uri.host().is_none() {
            return Err(ConfigError::UnsupportedUrl {
                url: self.url.clone(),
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[inline]
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.total_requests
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable report per target.
    Text,
    /// One JSON array holding a summary per target.
    Json,
}

/// Fire a fixed number of HTTP GET requests at one or more URLs and report
/// latency, throughput and status code statistics for each.
#[derive(Debug, Parser)]
#[command(name = "loadgen", version)]
pub struct Cli {
    /// Target URLs. Each one is tested by its own pipeline, all concurrently.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Number of concurrent workers per target.
    #[arg(short, long, env = "LOADGEN_CONCURRENCY", default_value_t = 10)]
    pub concurrency: usize,

    /// Total number of requests per target.
    #[arg(short = 'n', long = "requests", env = "LOADGEN_REQUESTS", default_value_t = 100)]
    pub total_requests: usize,

    /// Per-request timeout in milliseconds, covering headers and body.
    #[arg(long, env = "LOADGEN_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[arg(long, value_enum, env = "LOADGEN_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off). Unknown values fall back to info.
    #[arg(long, env = "LOADGEN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// `local` logs compact lines for a terminal, `prod` logs JSON lines.
    #[arg(long, value_enum, env = "LOADGEN_LOG_ENV", default_value_t = LogEnv::Local)]
    pub log_env: LogEnv,

    #[arg(long, env = "LOADGEN_SERVICE_NAME", default_value = "loadgen")]
    pub service_name: String,
}

impl Cli {
    /// One validated config per target URL, in command line order.
    pub fn run_configs(&self) -> Result<Vec<RunConfig>, ConfigError> {
        let timeout = Duration::from_millis(self.timeout_ms);
        self.urls
            .iter()
            .map(|url| RunConfig::new(url.as_str(), self.concurrency, self.total_requests, timeout))
            .collect()
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            env: self.log_env,
            service_name: self.service_name.clone(),
            level: self.log_level.clone(),
        }
    }
}
