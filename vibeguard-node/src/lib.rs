//! # VibeGuard Node
//!
//! The headless device process: wires the control-loop core, the anomaly
//! model and the MQTT link into one running node.
//!
//! ## Boot sequence
//!
//! 1. Load [`NodeConfig`] (JSON file plus environment overrides)
//! 2. Start the link manager and wait a bounded time for the broker
//! 3. Install the watchdog (never fatal)
//! 4. Start the [`Scheduler`] and run the [`ControlLoop`] until shutdown
//!
//! The connect wait comes before the watchdog install, so a slow broker at
//! boot cannot starve a watchdog nobody is feeding yet.
//!
//! ## Modules
//!
//! - [`config`]: configuration file and environment
//! - [`scheduler`]: periodic wake with tick dropping
//! - [`control`]: the per-tick iteration
//! - [`watchdog`]: device and software watchdogs
//! - [`sim`]: simulated accelerometer for hosts without one

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod scheduler;
pub mod sim;
pub mod watchdog;

pub use config::{ClassifierConfig, NodeConfig};
pub use control::{ControlLoop, Iteration, LoopStats};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats, Tick, TickReceiver};
pub use sim::{SimulatedSource, SimulationConfig};
pub use watchdog::{DeviceWatchdog, SoftwareWatchdog, WatchdogConfig, WatchdogMonitor};
