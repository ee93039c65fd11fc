//! Collaborator Traits
//!
//! The control loop owns timing, state and failure handling. Everything that
//! touches hardware, the model or the network sits behind one of these traits
//! so the loop can be driven by scripted fakes in tests.
//!
//! ## Module Organization
//!
//! - [`sensor`] - [`SampleSource`]: one calibrated 3-axis reading on demand
//! - [`classifier`] - [`Classifier`]: one full frame in, one anomaly score out
//! - [`telemetry`] - [`TelemetrySink`]: best-effort publish of a status message
//! - [`watchdog`] - [`Watchdog`]: the hardware liveness timer
//! - [`time`] - [`TimeSource`]: monotonic milliseconds since boot
//!
//! ## Design Philosophy
//!
//! Each trait is a single capability with a single hot-path method. Static
//! dispatch is the default: the loop is generic over its collaborators and
//! monomorphised once per device build.
//!
//! ```text
//!   SampleSource ──► WindowBuffer ──► Classifier ──► FaultConfirmation
//!                                                         │
//!   Watchdog ◄── feed after every iteration ◄── TelemetrySink ◄──┘
//! ```

pub mod sensor;
pub mod classifier;
pub mod telemetry;
pub mod watchdog;
pub mod time;

pub use sensor::SampleSource;
pub use classifier::{Classifier, AnomalyScore};
pub use telemetry::{TelemetrySink, PublishOutcome};
pub use watchdog::Watchdog;
pub use time::TimeSource;
