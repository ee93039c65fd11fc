//! Constants for the VibeGuard control loop
//!
//! Every tunable that the device firmware fixes at build time lives here,
//! grouped by the part of the loop it governs. Boot-time overrides go through
//! [`crate::config::LoopConfig`], whose defaults are taken from this module.
//!
//! ## Organization
//!
//! - **Sampling**: acquisition rate, frame geometry and accelerometer scaling
//! - **Detection**: anomaly threshold and fault confirmation count
//! - **Time**: heartbeat, watchdog window, reconnect backoff, connect wait
//! - **Buffers**: wire payload and identifier capacities
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Units are part of the name (`_MS`, `_HZ`, `_G`)
//! 3. Values must match the classifier the device ships with

/// Sampling rate, frame geometry and raw-to-g scaling.
pub mod sampling;

/// Anomaly threshold and debounce parameters.
pub mod detection;

/// Time-related constants for heartbeats, watchdog and reconnects.
pub mod time;

/// Buffer capacities for payloads and identifiers.
pub mod buffers;

// Re-export commonly used constants for convenience
pub use sampling::{
    SAMPLE_RATE_HZ, MAX_SAMPLE_RATE_HZ, FRAME_LEN, AXES, FRAME_VALUES, ACCEL_LSB_PER_G,
};

pub use detection::{ANOMALY_THRESHOLD, CONSECUTIVE_FAULTS_THRESHOLD};

pub use time::{
    MS_PER_SECOND, HEARTBEAT_INTERVAL_MS, WATCHDOG_WINDOW_MS,
    RECONNECT_BACKOFF_MS, CONNECT_WAIT_MS,
};

pub use buffers::{MAX_PAYLOAD_LEN, CLIENT_ID_CAPACITY};
