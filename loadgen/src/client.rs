use std::future::Future;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::Uri;
use http_body_util::Full;
use http_test_util::drain::DrainBodyFuture;
use http_test_util::empty_body;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout_at;

use crate::config::RunConfig;
use crate::error::RequestError;
use crate::statistics::RequestOutcome;

/// Fewest idle connections kept per host; runs with more workers keep one
/// per worker.
const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Issues timed GET requests against one target. Clones share the connection
/// pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    uri: Uri,
    timeout: Duration,
    max_idle_per_host: usize,
}

impl HttpClient {
    #[must_use]
    pub fn new(uri: Uri, timeout: Duration) -> Self {
        Self::with_pool_size(uri, timeout, POOL_MAX_IDLE_PER_HOST)
    }

    #[must_use]
    pub fn with_pool_size(uri: Uri, timeout: Duration, max_idle_per_host: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(max_idle_per_host)
            .build(connector);
        Self {
            client,
            uri,
            timeout,
            max_idle_per_host,
        }
    }

    #[must_use]
    pub fn for_config(config: &RunConfig) -> Self {
        Self::with_pool_size(
            config.uri().clone(),
            config.timeout(),
            config.concurrency().max(POOL_MAX_IDLE_PER_HOST),
        )
    }

    #[inline]
    #[must_use]
    pub fn max_idle_per_host(&self) -> usize {
        self.max_idle_per_host
    }

    /// Performs one GET and reads the body to the end.
    ///
    /// Never fails: transport errors and timeouts come back as a failed
    /// outcome whose duration is the time spent trying.
    pub async fn execute(&self) -> RequestOutcome {
        let (duration, exchange) = run_timed(self.exchange()).await;
        match exchange {
            Ok((status, response_len)) => RequestOutcome::success(status, duration, response_len),
            Err(err) => {
                tracing::trace!(error = %err, ?duration, "request failed");
                RequestOutcome::failure(err, duration)
            }
        }
    }

    /// One deadline covers both the response head and the body.
    async fn exchange(&self) -> Result<(u16, usize), RequestError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let request = Request::get(self.uri.clone())
            .body(empty_body())
            .map_err(|e| RequestError::Request {
                message: e.to_string(),
            })?;
        let resp = timeout_at(deadline, self.client.request(request))
            .await
            .map_err(|_| RequestError::Timeout)?
            .map_err(|e| RequestError::classify(&e))?;
        let status = resp.status().as_u16();
        // The body is dropped on every branch below, which hands the
        // connection back to the pool or closes it.
        let response_len = match timeout_at(deadline, DrainBodyFuture::new(resp.into_body())).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => {
                tracing::debug!(status, error = %e, "failed to read response body");
                0
            }
            Err(_) => {
                tracing::debug!(status, "timed out reading response body");
                0
            }
        };
        Ok((status, response_len))
    }
}

#[inline]
async fn run_timed<T, F: Future<Output = T>>(fut: F) -> (Duration, T) {
    let start = Instant::now();
    let res = fut.await;
    (start.elapsed(), res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(concurrency: usize) -> RunConfig {
        RunConfig::new("http://127.0.0.1:8080/", concurrency, 1_000, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn pool_keeps_at_least_the_default() {
        assert_eq!(HttpClient::for_config(&config(10)).max_idle_per_host(), 100);
        assert_eq!(HttpClient::for_config(&config(100)).max_idle_per_host(), 100);
    }

    #[tokio::test]
    async fn pool_grows_with_concurrency() {
        assert_eq!(HttpClient::for_config(&config(250)).max_idle_per_host(), 250);
    }
}
