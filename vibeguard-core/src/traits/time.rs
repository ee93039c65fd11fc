//! Time Source Abstraction
//!
//! The loop reads the clock once per iteration and passes the value down, so
//! every decision in one iteration sees the same `now`.
//!
//! ## Common Implementations
//!
//! - `MonotonicTime`: host monotonic clock, milliseconds since start
//! - `FixedTime`: controllable time for testing

use crate::time::Timestamp;

/// Source of monotonic time for the loop
///
/// ## Implementation Requirements
///
/// - `now()` must never go backwards
/// - The epoch is device boot (or any fixed point before the loop starts)
///
/// ## Platform-Specific Considerations
///
/// ### Bare Metal / RTOS
/// - Use the kernel uptime counter (e.g. a 1 kHz tick)
/// - Handle counter wraparound before converting to `u64`
///
/// ### Linux
/// - `CLOCK_MONOTONIC`, never `CLOCK_REALTIME`
pub trait TimeSource {
    /// Current time in milliseconds since boot
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
