//! Time management for the control loop
//!
//! The loop only ever needs monotonic milliseconds since boot: heartbeats and
//! publish timestamps are intervals, never wall-clock times.
//! - [`MonotonicTime`]: uptime from the host's monotonic clock (requires std)
//! - [`FixedTime`]: manually advanced clock for tests and replays

use core::cell::Cell;

pub use crate::traits::TimeSource;

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Uptime clock backed by `std::time::Instant`
///
/// Starts at 0 when created, always increases.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    boot: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicTime {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            boot: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        self.boot.elapsed().as_millis() as Timestamp
    }
}

/// Fixed time source for testing
///
/// Uses a `Cell` so a shared reference can be advanced while the code under
/// test holds the same clock.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Cell<Timestamp>,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: Cell::new(timestamp),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get().saturating_add(ms));
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Milliseconds elapsed between two timestamps, zero if `later` is earlier
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
