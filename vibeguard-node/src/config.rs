//! Node configuration
//!
//! Everything the node needs at boot, read from one JSON file. Every section
//! and every field is optional; missing ones take the device defaults.
//!
//! ```json
//! {
//!   "control":  { "threshold": 300.0, "heartbeat_ms": 10000 },
//!   "mqtt":     { "host": "broker.local", "topic": "plant/press-3/status" },
//!   "watchdog": { "device": "/dev/watchdog0", "software_fallback": true },
//!   "simulation": { "fault_after_secs": 30 }
//! }
//! ```
//!
//! The file path comes from `VIBEGUARD_CONFIG`. Broker credentials may be
//! supplied through `VIBEGUARD_MQTT_USERNAME` and `VIBEGUARD_MQTT_PASSWORD`
//! instead of the file; the environment wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use vibeguard_connectors::mqtt::MqttConfig;
use vibeguard_core::LoopConfig;
use vibeguard_ml::{CentroidClassifier, Cluster, DEFAULT_SCALE};

use crate::sim::SimulationConfig;
use crate::watchdog::WatchdogConfig;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "VIBEGUARD_CONFIG";

/// Environment variable overriding the broker username
pub const USERNAME_ENV: &str = "VIBEGUARD_MQTT_USERNAME";

/// Environment variable overriding the broker password
pub const PASSWORD_ENV: &str = "VIBEGUARD_MQTT_PASSWORD";

/// Anomaly model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Distance-to-score factor
    pub scale: f32,
    /// Healthy clusters; the built-in motor model when empty
    pub clusters: Vec<Cluster>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            clusters: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    /// Build the model for frames of `expected_len` interleaved values
    pub fn build(&self, expected_len: usize) -> Result<CentroidClassifier> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            anyhow::bail!("classifier scale must be positive, got {}", self.scale);
        }

        let model = if self.clusters.is_empty() {
            CentroidClassifier::healthy_motor(expected_len)
        } else {
            let mut model = CentroidClassifier::new(expected_len);
            model
                .load(self.clusters.iter().copied())
                .context("loading classifier clusters")?;
            model
        };
        Ok(model.with_scale(self.scale))
    }
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Control-loop tunables
    pub control: LoopConfig,
    /// Broker connection
    pub mqtt: MqttConfig,
    /// Watchdog selection
    pub watchdog: WatchdogConfig,
    /// Simulated sensor
    pub simulation: SimulationConfig,
    /// Anomaly model
    pub classifier: ClassifierConfig,
}

impl NodeConfig {
    /// Load from the file named by `VIBEGUARD_CONFIG`, or defaults if unset
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = Self::load_from(path.as_deref())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`, or return defaults for `None`
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No {} set, using built-in defaults", CONFIG_ENV);
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply credential overrides looked up through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup(USERNAME_ENV).filter(|v| !v.is_empty()) {
            self.mqtt.username = Some(username);
        }
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.mqtt.password = Some(password);
        }
    }

    /// Reject configurations the node cannot run with
    pub fn validate(&self) -> Result<()> {
        self.control
            .validate()
            .context("invalid control configuration")?;
        self.mqtt.validate().context("invalid mqtt configuration")?;
        Ok(())
    }
}
