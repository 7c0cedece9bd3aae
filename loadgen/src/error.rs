//! Error types for the load generator.
//!
//! [`ConfigError`] is raised before a run starts. [`RequestError`] never
//! escapes a worker: it is carried as data inside a
//! [`RequestOutcome`](crate::statistics::RequestOutcome).

/// Invalid run parameters, reported before any worker is launched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("total request count must be at least 1")]
    ZeroRequests,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid target URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    /// Only plain `http://` URLs with a host can be driven by the client.
    #[error("unsupported target URL '{url}': expected http://host[:port]/path")]
    UnsupportedUrl { url: String },
}

/// Why a single request produced no response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No response headers arrived before the per-request deadline.
    #[error("request timed out")]
    Timeout,

    /// DNS resolution or TCP connect failed.
    #[error("connection error: {message}")]
    Connect { message: String },

    /// The request could not be built, written or its response parsed.
    #[error("request error: {message}")]
    Request { message: String },
}

impl RequestError {
    /// Short label used to group failures in reports.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect { .. } => "connect",
            Self::Request { .. } => "request",
        }
    }

    pub fn classify(err: &hyper_util::client::legacy::Error) -> Self {
        let message = error_chain(err);
        if err.is_connect() {
            Self::Connect { message }
        } else {
            Self::Request { message }
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
