//! Structured logging setup.
//!
//! The subscriber is built from an explicit [`LogConfig`] and installed once
//! by the binary; library code only emits `tracing` events.

use std::fmt;

use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Wall clock time of day shown on local log lines.
const LOCAL_TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogEnv {
    Local,
    Prod,
}

impl fmt::Display for LogEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Prod => "prod",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub env: LogEnv,
    pub service_name: String,
    pub level: String,
}

impl LogConfig {
    /// Parsed log level; anything unrecognised means `info`.
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        // `LevelFilter` parses a blank string as ERROR.
        let level = self.level.trim();
        if level.is_empty() {
            return LevelFilter::INFO;
        }
        level.parse().unwrap_or(LevelFilter::INFO)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .parse_lossy("")
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// reports.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(build_subscriber(config, std::io::stderr))
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;
    tracing::debug!(env = %config.env, level = %config.level_filter(), "logging initialized");
    Ok(())
}

/// Every event carries its source file and line. `local` prints compact lines
/// stamped with the time of day, `prod` prints JSON lines with RFC 3339
/// timestamps and the current span's fields.
fn build_subscriber<W>(config: &LogConfig, writer: W) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    match config.env {
        LogEnv::Local => Box::new(
            builder
                .compact()
                .with_timer(ChronoLocal::new(LOCAL_TIME_FORMAT.to_string()))
                .finish(),
        ),
        LogEnv::Prod => Box::new(builder.json().with_current_span(true).finish()),
    }
}

/// Root span for a whole invocation, tagging every event with the service
/// name and environment.
#[must_use]
pub fn run_span(config: &LogConfig) -> tracing::Span {
    tracing::info_span!("loadgen", service = %config.service_name, env = %config.env)
}
