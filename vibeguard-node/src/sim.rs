//! Simulated accelerometer for host runs
//!
//! Produces what an accelerometer on a running motor would: a shaft-rate
//! vibration on all three axes, gravity on Z, a little broadband noise and
//! 16-bit quantisation. A fault segment raises the vibration amplitude for a
//! configurable stretch of time, and the bus can be made to fail
//! periodically.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use vibeguard_core::constants::ACCEL_LSB_PER_G;
use vibeguard_core::{Sample, SampleSource, SensorError};

/// Simulated machine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Shaft rotation frequency (Hz)
    pub shaft_hz: f32,
    /// Healthy vibration amplitude per axis (g)
    pub vibration_g: f32,
    /// Vibration amplitude during the fault segment (g)
    pub fault_vibration_g: f32,
    /// Peak uniform noise per axis (g)
    pub noise_g: f32,
    /// Start of the fault segment (seconds after boot); none if absent
    pub fault_after_secs: Option<u64>,
    /// Length of the fault segment (seconds)
    pub fault_duration_secs: u64,
    /// Every n-th read fails with a bus error; never if absent
    pub bus_error_every: Option<u64>,
    /// Noise generator seed
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            shaft_hz: 185.0 / 60.0,
            vibration_g: 0.05,
            fault_vibration_g: 0.5,
            noise_g: 0.002,
            fault_after_secs: None,
            fault_duration_secs: 20,
            bus_error_every: None,
            seed: 0x5eed,
        }
    }
}

/// Synthetic [`SampleSource`]
pub struct SimulatedSource {
    config: SimulationConfig,
    rate_hz: u32,
    reads: u64,
    rng: StdRng,
}

impl SimulatedSource {
    /// Source sampled at `rate_hz`
    pub fn new(config: SimulationConfig, rate_hz: u32) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rate_hz: rate_hz.max(1),
            reads: 0,
            rng,
        }
    }

    /// Simulated time of the next reading (seconds)
    pub fn time_secs(&self) -> f32 {
        self.reads as f32 / self.rate_hz as f32
    }

    /// Whether the fault segment covers simulated time `t`
    pub fn in_fault(&self, t: f32) -> bool {
        match self.config.fault_after_secs {
            Some(start) => {
                let start = start as f32;
                t >= start && t < start + self.config.fault_duration_secs as f32
            }
            None => false,
        }
    }

    fn noise(&mut self) -> f32 {
        let peak = self.config.noise_g.abs();
        if peak == 0.0 {
            0.0
        } else {
            self.rng.gen_range(-peak..=peak)
        }
    }

    /// Quantise to what the sensor register would hold
    fn to_counts(g: f32) -> i16 {
        (g * ACCEL_LSB_PER_G)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

impl SampleSource for SimulatedSource {
    fn read(&mut self) -> nb::Result<Sample, SensorError> {
        let t = self.time_secs();
        self.reads += 1;

        if let Some(every) = self.config.bus_error_every.filter(|n| *n > 0) {
            if self.reads % every == 0 {
                return Err(nb::Error::Other(SensorError::Bus {
                    reason: "simulated NACK",
                }));
            }
        }

        let amplitude = if self.in_fault(t) {
            self.config.fault_vibration_g
        } else {
            self.config.vibration_g
        };
        let phase = TAU * self.config.shaft_hz * t;

        let x = amplitude * phase.sin() + self.noise();
        let y = amplitude * phase.cos() + self.noise();
        let z = 1.0 + amplitude * (phase + 1.0).sin() + self.noise();

        Ok(Sample::from_raw(
            Self::to_counts(x),
            Self::to_counts(y),
            Self::to_counts(z),
        ))
    }
}
