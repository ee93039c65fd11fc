//! Control-loop configuration
//!
//! [`LoopConfig`] gathers the tunables of the acquisition-to-publish loop.
//! Defaults come from [`crate::constants`]; a deployment may override any of
//! them at boot (the node binary reads them from a JSON file).
//!
//! ```rust
//! use vibeguard_core::config::LoopConfig;
//!
//! let config = LoopConfig::new()
//!     .with_threshold(250.0)
//!     .with_consecutive_faults(5);
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::sampling::tick_period_us;
use crate::constants::{
    ANOMALY_THRESHOLD, CONNECT_WAIT_MS, CONSECUTIVE_FAULTS_THRESHOLD,
    HEARTBEAT_INTERVAL_MS, RECONNECT_BACKOFF_MS, SAMPLE_RATE_HZ, WATCHDOG_WINDOW_MS,
};
use crate::errors::ConfigError;
use crate::traits::AnomalyScore;

/// Tunables of the control loop
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopConfig {
    /// Sampling rate (Hz)
    pub sample_rate_hz: u32,
    /// Scores strictly above this are anomalous
    pub threshold: AnomalyScore,
    /// Consecutive anomalous frames needed to latch a fault
    pub consecutive_faults: u32,
    /// OK heartbeat interval (ms)
    pub heartbeat_ms: u64,
    /// Watchdog window (ms)
    pub watchdog_window_ms: u32,
    /// Delay before a reconnect attempt (ms)
    pub reconnect_backoff_ms: u64,
    /// Bounded wait for the first connection at boot (ms)
    pub connect_wait_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: SAMPLE_RATE_HZ,
            threshold: ANOMALY_THRESHOLD,
            consecutive_faults: CONSECUTIVE_FAULTS_THRESHOLD,
            heartbeat_ms: HEARTBEAT_INTERVAL_MS,
            watchdog_window_ms: WATCHDOG_WINDOW_MS,
            reconnect_backoff_ms: RECONNECT_BACKOFF_MS,
            connect_wait_ms: CONNECT_WAIT_MS,
        }
    }
}

impl LoopConfig {
    /// Configuration with the device defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling rate
    pub fn with_sample_rate(mut self, hz: u32) -> Self {
        self.sample_rate_hz = hz;
        self
    }

    /// Set the anomaly threshold
    pub fn with_threshold(mut self, threshold: AnomalyScore) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the number of consecutive anomalous frames that latch a fault
    pub fn with_consecutive_faults(mut self, count: u32) -> Self {
        self.consecutive_faults = count;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_ms(mut self, ms: u64) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    /// Set the watchdog window
    pub fn with_watchdog_window_ms(mut self, ms: u32) -> Self {
        self.watchdog_window_ms = ms;
        self
    }

    /// Set the reconnect backoff
    pub fn with_reconnect_backoff_ms(mut self, ms: u64) -> Self {
        self.reconnect_backoff_ms = ms;
        self
    }

    /// Set the boot connect wait
    pub fn with_connect_wait_ms(mut self, ms: u64) -> Self {
        self.connect_wait_ms = ms;
        self
    }

    /// Tick period in microseconds
    pub fn tick_period_us(&self) -> Option<u64> {
        tick_period_us(self.sample_rate_hz)
    }

    /// Reject values the loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate_hz",
                reason: "must be positive",
            });
        }
        if tick_period_us(self.sample_rate_hz).is_none() {
            return Err(ConfigError::Invalid {
                field: "sample_rate_hz",
                reason: "tick period rounds to zero",
            });
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "threshold",
                reason: "must be finite",
            });
        }
        if self.consecutive_faults == 0 {
            return Err(ConfigError::Invalid {
                field: "consecutive_faults",
                reason: "must be at least 1",
            });
        }
        if self.heartbeat_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "heartbeat_ms",
                reason: "must be positive",
            });
        }
        if self.watchdog_window_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "watchdog_window_ms",
                reason: "must be positive",
            });
        }

        // The loop feeds once per tick; a window shorter than a tick resets the device
        let tick_ms = 1000 / u64::from(self.sample_rate_hz);
        if u64::from(self.watchdog_window_ms) <= tick_ms {
            return Err(ConfigError::Invalid {
                field: "watchdog_window_ms",
                reason: "must exceed the tick period",
            });
        }

        if self.reconnect_backoff_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "reconnect_backoff_ms",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}
