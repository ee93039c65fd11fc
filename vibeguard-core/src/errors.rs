//! Error Types for the Acquisition-to-Publish Loop
//!
//! ## Design Philosophy
//!
//! The control loop runs for the lifetime of the device and must never stop
//! because of a recoverable condition. Its errors are therefore shaped for
//! local recovery rather than for propagation:
//!
//! 1. **Small Size**: every variant carries at most a couple of words, since
//!    errors are produced on the 100 Hz path.
//!
//! 2. **No Heap Allocation**: context is `&'static str` or plain integers.
//!
//! 3. **Copy Semantics**: errors are returned by value and logged, never
//!    boxed or chained.
//!
//! ## Failure Categories
//!
//! [`LoopFault`] names the four categories the loop distinguishes:
//!
//! | Category    | Example                        | Handling                         |
//! |-------------|--------------------------------|----------------------------------|
//! | Sensor      | I2C transfer NACKed            | skip this tick                   |
//! | Classifier  | frame length mismatch          | discard frame, keep sampling     |
//! | Transport   | broker rejected CONNECT        | link state machine retries       |
//! | Liveness    | loop stalled past the window   | watchdog resets the device       |
//!
//! Only the last one is fatal, and it is not handled in software at all.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use vibeguard_core::errors::{ClassifierError, LoopFault};
//!
//! fn on_rejected(err: ClassifierError) -> LoopFault {
//!     // Nothing to undo: the fault state is only touched after a score exists
//!     LoopFault::Classifier(err)
//! }
//! ```

use thiserror_no_std::Error;

/// Failure reading one sample from the sensor
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transfer to the sensor failed
    #[error("Bus transfer failed: {reason}")]
    Bus {
        /// Short description from the bus driver
        reason: &'static str,
    },

    /// Sensor has not been initialised or failed its identity check
    #[error("Sensor not ready")]
    NotReady,

    /// Reading contained NaN or infinity
    #[error("Invalid value: not a valid number")]
    InvalidValue,
}

/// Classifier refused to score a frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierError {
    /// Frame does not have the number of values the model was built for
    #[error("Frame has {actual} values, model expects {expected}")]
    LengthMismatch {
        /// Values the model consumes
        expected: usize,
        /// Values handed over
        actual: usize,
    },

    /// Model pipeline reported an internal error
    #[error("Model rejected frame: {reason}")]
    Rejected {
        /// Short description from the model runtime
        reason: &'static str,
    },

    /// Model produced NaN or infinity
    #[error("Model produced a non-finite score")]
    NonFiniteScore,
}

/// Watchdog device errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogError {
    /// No watchdog device present
    #[error("Watchdog device unavailable: {reason}")]
    Unavailable {
        /// Why the device could not be opened
        reason: &'static str,
    },

    /// Device present but the timeout could not be installed
    #[error("Watchdog install failed: {reason}")]
    InstallFailed {
        /// Why the install failed
        reason: &'static str,
    },

    /// Feeding the device failed
    #[error("Watchdog feed failed")]
    FeedFailed,
}

/// Telemetry payload could not be encoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Encoded payload would exceed the fixed buffer
    #[error("Payload exceeds {max} bytes")]
    Overflow {
        /// Buffer capacity in bytes
        max: usize,
    },
}

/// Boot-time configuration rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is out of its valid range
    #[error("Invalid configuration: {field} {reason}")]
    Invalid {
        /// Offending field name
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// The four failure categories of the control loop
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopFault {
    /// Transient sensor read failure; the tick is skipped
    #[error("Sensor: {0}")]
    Sensor(SensorError),

    /// Classifier rejection; the frame is discarded
    #[error("Classifier: {0}")]
    Classifier(ClassifierError),

    /// Connect or publish failure; recovered by the link state machine
    #[error("Transport: {reason}")]
    Transport {
        /// Short description
        reason: &'static str,
    },

    /// Loop stalled; only the watchdog can recover
    #[error("Liveness lost")]
    Liveness,
}

impl LoopFault {
    /// Whether the loop recovers from this fault without a device reset
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, LoopFault::Liveness)
    }
}

impl From<SensorError> for LoopFault {
    fn from(err: SensorError) -> Self {
        LoopFault::Sensor(err)
    }
}

impl From<ClassifierError> for LoopFault {
    fn from(err: ClassifierError) -> Self {
        LoopFault::Classifier(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Bus { reason } => defmt::write!(fmt, "Bus: {}", reason),
            Self::NotReady => defmt::write!(fmt, "Sensor not ready"),
            Self::InvalidValue => defmt::write!(fmt, "Invalid value"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClassifierError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::LengthMismatch { expected, actual } =>
                defmt::write!(fmt, "Frame has {} values, expected {}", actual, expected),
            Self::Rejected { reason } => defmt::write!(fmt, "Rejected: {}", reason),
            Self::NonFiniteScore => defmt::write!(fmt, "Non-finite score"),
        }
    }
}
