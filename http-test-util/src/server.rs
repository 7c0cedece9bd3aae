//! In-process HTTP/1 server with scripted replies, for exercising clients
//! against real sockets.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::{byte_body, SharedCounter};

/// What the server answers to a single request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub delay: Duration,
    pub body: Bytes,
}

impl Reply {
    #[must_use]
    pub fn ok<B: Into<Bytes>>(body: B) -> Self {
        Self {
            status: StatusCode::OK,
            delay: Duration::ZERO,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
            body: Bytes::new(),
        }
    }

    /// Holds the response back for `delay` before sending it.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Hand-written response bytes, for exchanges a well-behaved server would
/// never produce. `head` is written once the request has been read, `tail`
/// after `pause`, then the connection is closed.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub head: Bytes,
    pub pause: Duration,
    pub tail: Bytes,
}

impl RawReply {
    /// A 200 that announces `declared_len` body bytes but closes after `body`.
    #[must_use]
    pub fn truncated(declared_len: usize, body: &[u8]) -> Self {
        let mut head =
            format!("HTTP/1.1 200 OK\r\ncontent-length: {declared_len}\r\n\r\n").into_bytes();
        head.extend_from_slice(body);
        Self {
            head: head.into(),
            pause: Duration::ZERO,
            tail: Bytes::new(),
        }
    }

    /// A 200 whose headers go out at once and whose body follows `delay` later.
    #[must_use]
    pub fn slow_body(body: &[u8], delay: Duration) -> Self {
        let head = format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n", body.len());
        Self {
            head: head.into(),
            pause: delay,
            tail: Bytes::copy_from_slice(body),
        }
    }
}

/// Picks a reply given the zero-based index of the request across the
/// lifetime of the server.
pub type Responder = Arc<dyn Fn(usize) -> Reply + Send + Sync>;

pub struct TestServer {
    addr: SocketAddr,
    hits: SharedCounter,
    accept_loop: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn<F>(responder: F) -> anyhow::Result<Self>
    where
        F: Fn(usize) -> Reply + Send + Sync + 'static,
    {
        let sock = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test server")?;
        let addr = sock
            .local_addr()
            .context("Failed to read test server address")?;
        let hits = SharedCounter::new();
        let responder: Responder = Arc::new(responder);
        let accept_loop = tokio::spawn(run_app(sock, hits.clone(), responder));
        Ok(Self {
            addr,
            hits,
            accept_loop,
        })
    }

    /// Answers every connection's first request with `reply`, bypassing hyper.
    pub async fn raw(reply: RawReply) -> anyhow::Result<Self> {
        let sock = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind raw test server")?;
        let addr = sock
            .local_addr()
            .context("Failed to read raw test server address")?;
        let hits = SharedCounter::new();
        let accept_loop = tokio::spawn(run_raw(sock, hits.clone(), reply));
        Ok(Self {
            addr,
            hits,
            accept_loop,
        })
    }

    /// Serves the same reply to every request.
    pub async fn fixed(reply: Reply) -> anyhow::Result<Self> {
        Self::spawn(move |_| reply.clone()).await
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Number of requests the server has started answering.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn run_app(sock: TcpListener, hits: SharedCounter, responder: Responder) {
    loop {
        let (tcp, _peer) = match sock.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "test server failed to accept");
                continue;
            }
        };
        let tcp = TokioIo::new(tcp);
        let hits = hits.clone();
        let responder = responder.clone();
        tokio::task::spawn(async move {
            let service = service_fn(move |req| my_service(hits.clone(), responder.clone(), req));
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(tcp, service)
                .await
            {
                tracing::debug!(error = %e, "test server connection closed");
            }
        });
    }
}

async fn my_service(
    hits: SharedCounter,
    responder: Responder,
    _incoming: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let reply = responder(hits.increment());
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let mut resp = Response::new(byte_body(reply.body));
    *resp.status_mut() = reply.status;
    Ok(resp)
}

async fn run_raw(sock: TcpListener, hits: SharedCounter, reply: RawReply) {
    loop {
        let (tcp, _peer) = match sock.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "raw test server failed to accept");
                continue;
            }
        };
        let hits = hits.clone();
        let reply = reply.clone();
        tokio::task::spawn(async move {
            if let Err(e) = write_raw(tcp, hits, reply).await {
                tracing::debug!(error = %e, "raw test server connection closed");
            }
        });
    }
}

async fn write_raw(mut tcp: TcpStream, hits: SharedCounter, reply: RawReply) -> anyhow::Result<()> {
    // Read the whole request head first; closing with unread input would
    // reset the connection before the client sees the response.
    let mut request = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tcp.read(&mut buf).await.context("Failed to read request")?;
        if n == 0 {
            anyhow::bail!("Client closed before sending a full request head");
        }
        request.extend_from_slice(&buf[..n]);
    }
    hits.increment();
    tcp.write_all(&reply.head).await.context("Failed to write head")?;
    tcp.flush().await.context("Failed to flush head")?;
    if !reply.pause.is_zero() {
        tokio::time::sleep(reply.pause).await;
    }
    tcp.write_all(&reply.tail).await.context("Failed to write tail")?;
    tcp.shutdown().await.context("Failed to shut down connection")?;
    Ok(())
}
