//! Per-process MESSAGE identifier source.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter handing out `message-id` header values.
///
/// Ids are unique for the lifetime of the process only; they restart at 1
/// after a restart. A counter cannot collide the way two wall-clock
/// timestamps taken in the same tick can.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: AtomicU64,
}

impl MessageIdGenerator {
    /// Creates a generator whose first id is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}
