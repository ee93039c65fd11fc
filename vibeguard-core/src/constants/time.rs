//! Time-Related Constants
//!
//! This module defines the intervals that bound the control loop's timing:
//! how often an idle device proves it is alive, how long the loop may stall
//! before the watchdog resets the SoC, and how the telemetry link paces its
//! reconnect attempts.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== TELEMETRY =====

/// Heartbeat interval (milliseconds).
///
/// An `OK` status is republished when strictly more than this much time has
/// passed since the last publish and no fault is latched.
pub const HEARTBEAT_INTERVAL_MS: u64 = 10 * MS_PER_SECOND;

// ===== WATCHDOG =====

/// Watchdog window (milliseconds).
///
/// The loop must feed the watchdog at least once per window. At 100 Hz the
/// loop feeds every 10 ms, leaving two orders of magnitude of headroom.
pub const WATCHDOG_WINDOW_MS: u32 = 1000;

// ===== CONNECTION =====

/// Fixed delay before a reconnect attempt (milliseconds).
pub const RECONNECT_BACKOFF_MS: u64 = 5 * MS_PER_SECOND;

/// Bounded wait for the first broker acknowledgement at boot (milliseconds).
///
/// Also used as the acknowledgement deadline of every connect attempt.
pub const CONNECT_WAIT_MS: u64 = 10 * MS_PER_SECOND;
