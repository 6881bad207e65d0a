//! Shared index generator.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Monotonic counter handing out top-level part positions.
///
/// One instance is shared (behind an `Arc`) by an orchestrator and every
/// merge encoder it creates, so positions never collide.
#[derive(Debug, Default)]
pub struct IndexGenerator {
    value: AtomicUsize,
}

impl IndexGenerator {
    /// Create a generator starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next position `up` will return.
    #[must_use]
    pub fn value(&self) -> usize {
        self.value.load(Ordering::SeqCst)
    }

    /// Return the current value, then increment.
    pub fn up(&self) -> usize {
        self.value.fetch_add(1, Ordering::SeqCst)
    }
}
