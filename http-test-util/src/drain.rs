use bytes::Buf;
use hyper::body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project! {
    /// Reads a body to the end without buffering it, resolving to the number
    /// of payload bytes seen.
    pub struct DrainBodyFuture<B: Body> {
        #[pin]
        body: B,
        len: usize,
    }
}

impl<B> DrainBodyFuture<B>
where
    B: Body,
{
    #[inline]
    #[must_use]
    pub fn new(body: B) -> Self {
        Self { body, len: 0 }
    }
}

impl<B> Future for DrainBodyFuture<B>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    type Output = Result<usize, anyhow::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slf = self.project();
        loop {
            let Some(next_res) = ready!(slf.body.as_mut().poll_frame(cx)) else {
                return Poll::Ready(Ok(*slf.len));
            };
            let next_frame = match next_res {
                Ok(frame) => frame,
                Err(e) => {
                    return Poll::Ready(Err(anyhow::anyhow!("Failed to poll next frame: {e}")));
                }
            };
            // Trailer frames carry no payload.
            if let Some(data) = next_frame.data_ref() {
                *slf.len += data.remaining();
            }
            if slf.body.is_end_stream() {
                return Poll::Ready(Ok(*slf.len));
            }
        }
    }
}
