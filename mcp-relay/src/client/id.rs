//! Request ID generation for one client instance.

use std::sync::atomic::{AtomicI64, Ordering};

/// Produces strictly increasing, strictly positive request IDs.
///
/// A 64-bit counter is not going to wrap in the lifetime of a child
/// process, so no wraparound handling exists.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicI64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unique ID. Safe under concurrent callers.
    pub fn next_id(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
