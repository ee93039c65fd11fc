//! Control-loop core for VibeGuard
//!
//! Turns a stream of 3-axis acceleration samples into debounced fault
//! telemetry on a resource-constrained device.
//!
//! Key constraints:
//! - Runs unchanged on a microcontroller (`no_std`, no heap)
//! - No allocation on the 100 Hz sampling path
//! - Never stops for a recoverable failure; only the watchdog resets
//!
//! The pieces are pure state machines, driven by the node binary:
//!
//! ```text
//! Sample ──► WindowBuffer ──► Classifier ──► FaultConfirmation ──► PublishPolicy
//!                                                                      │
//!                                     ConnectionMachine ◄── publish ◄──┘
//! ```
//!
//! ```no_run
//! use vibeguard_core::{FaultConfirmation, PublishPolicy, Sample, WindowBuffer};
//!
//! let mut window: WindowBuffer<100> = WindowBuffer::new();
//! let mut fault = FaultConfirmation::new(300.0, 3);
//! let mut policy = PublishPolicy::new(10_000);
//!
//! if let Some(frame) = window.append(Sample::from_raw(12, -40, 16384)) {
//!     let score = 42.0; // classifier output for `frame`
//!     let transition = fault.observe(score);
//!     if let Some(status) = policy.decide(transition, fault.is_latched(), 1_000) {
//!         // publish `status`
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod constants;
pub mod errors;
pub mod fault;
pub mod sample;
pub mod telemetry;
pub mod time;
pub mod traits;
pub mod window;

// Public API
pub use config::LoopConfig;
pub use connection::{AckOutcome, ConnectDecision, ConnectionMachine, ConnectionState, RetryTicket};
pub use errors::{ClassifierError, ConfigError, EncodeError, LoopFault, SensorError, WatchdogError};
pub use fault::{FaultConfirmation, FaultPhase, FaultState, FaultTransition};
pub use sample::{Axis, Sample};
pub use telemetry::{Payload, PublishPolicy, Status, TelemetryMessage};
pub use time::{FixedTime, Timestamp};
#[cfg(feature = "std")]
pub use time::MonotonicTime;
pub use traits::{
    AnomalyScore, Classifier, PublishOutcome, SampleSource, TelemetrySink, TimeSource, Watchdog,
};
pub use window::{Frame, WindowBuffer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
