pub mod drain;
pub mod server;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;

#[inline]
pub fn empty_body() -> Full<Bytes> {
    Full::new(Bytes::new())
}

#[inline]
pub fn byte_body<B: Into<Bytes>>(bytes: B) -> Full<Bytes> {
    Full::new(bytes.into())
}

/// Request counter shared between a test server's connections.
#[derive(Clone, Default)]
pub struct SharedCounter {
    count: Arc<AtomicUsize>,
}

impl SharedCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bumps the counter, returning the value before the increment.
    #[inline]
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::AcqRel)
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_shared_between_clones() {
        let counter = SharedCounter::new();
        let other = counter.clone();
        assert_eq!(counter.increment(), 0);
        assert_eq!(other.increment(), 1);
        assert_eq!(counter.get(), 2);
    }
}
