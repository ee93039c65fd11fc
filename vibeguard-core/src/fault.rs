//! Fault Confirmation State Machine
//!
//! Turns a noisy per-frame anomaly score into a debounced, latched status.
//!
//! ## States
//!
//! ```text
//!            score > T                 count >= C
//!   Clear ─────────────► Suspect(n) ───────────────► Latched
//!     ▲                      │                          │
//!     │     score <= T       │        score <= T        │
//!     └──────────────────────┴──────────────────────────┘
//! ```
//!
//! The debounce is asymmetric: raising a fault takes `C` consecutive
//! anomalous frames, clearing it takes one clean frame. A transient spike
//! cannot raise an alarm, and a resolved condition stops alarming at once.
//!
//! ## Usage Example
//!
//! ```rust
//! use vibeguard_core::fault::{FaultConfirmation, FaultTransition};
//!
//! let mut fault = FaultConfirmation::new(300.0, 2);
//! assert_eq!(fault.observe(350.0), FaultTransition::Unchanged);
//! assert_eq!(fault.observe(350.0), FaultTransition::Raised);
//! assert_eq!(fault.observe(120.0), FaultTransition::Cleared);
//! ```

use crate::time::Timestamp;
use crate::traits::AnomalyScore;

/// Debounce phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultPhase {
    /// Last frame was normal
    Clear,
    /// `n` consecutive anomalous frames, not yet confirmed
    Suspect(u32),
    /// Fault confirmed and latched
    Latched,
}

/// Latch edge produced by one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultTransition {
    /// Clear or Suspect became Latched on this frame
    Raised,
    /// Latched became Clear on this frame
    Cleared,
    /// Latch unchanged
    Unchanged,
}

/// Snapshot of the loop's fault bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultState {
    /// Consecutive frames with `score > threshold`
    pub consecutive_anomalous_count: u32,
    /// Fault confirmed and not yet cleared
    pub latched: bool,
    /// Time of the last publish decision
    pub last_publish_time: Timestamp,
}

/// Hysteresis over per-frame anomaly scores
#[derive(Debug, Clone)]
pub struct FaultConfirmation {
    threshold: AnomalyScore,
    required: u32,
    consecutive: u32,
    latched: bool,
}

impl FaultConfirmation {
    /// Fault latches after `required` consecutive scores above `threshold`
    ///
    /// A `required` of zero is treated as one.
    pub fn new(threshold: AnomalyScore, required: u32) -> Self {
        Self {
            threshold,
            required: required.max(1),
            consecutive: 0,
            latched: false,
        }
    }

    /// Feed the score of one classified frame
    pub fn observe(&mut self, score: AnomalyScore) -> FaultTransition {
        if score > self.threshold {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }

        let confirmed = self.consecutive >= self.required;
        match (self.latched, confirmed) {
            (false, true) => {
                self.latched = true;
                FaultTransition::Raised
            }
            (true, false) => {
                self.latched = false;
                FaultTransition::Cleared
            }
            _ => FaultTransition::Unchanged,
        }
    }

    /// Whether `score` counts as anomalous
    pub fn is_anomalous(&self, score: AnomalyScore) -> bool {
        score > self.threshold
    }

    /// Current debounce phase
    pub fn phase(&self) -> FaultPhase {
        if self.latched {
            FaultPhase::Latched
        } else if self.consecutive > 0 {
            FaultPhase::Suspect(self.consecutive)
        } else {
            FaultPhase::Clear
        }
    }

    /// Fault confirmed and not cleared
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Consecutive anomalous frames so far
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Threshold scores are compared against
    pub fn threshold(&self) -> AnomalyScore {
        self.threshold
    }

    /// Snapshot together with the publish policy's bookkeeping
    pub fn state(&self, last_publish_time: Timestamp) -> FaultState {
        FaultState {
            consecutive_anomalous_count: self.consecutive,
            latched: self.latched,
            last_publish_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_short_never_latches() {
        let mut fault = FaultConfirmation::new(300.0, 3);
        assert_eq!(fault.observe(301.0), FaultTransition::Unchanged);
        assert_eq!(fault.observe(400.0), FaultTransition::Unchanged);
        assert_eq!(fault.phase(), FaultPhase::Suspect(2));

        assert_eq!(fault.observe(100.0), FaultTransition::Unchanged);
        assert_eq!(fault.phase(), FaultPhase::Clear);
        assert!(!fault.is_latched());
    }

    #[test]
    fn latches_on_the_required_frame() {
        let mut fault = FaultConfirmation::new(300.0, 3);
        fault.observe(310.0);
        fault.observe(320.0);
        assert_eq!(fault.observe(330.0), FaultTransition::Raised);
        assert_eq!(fault.phase(), FaultPhase::Latched);

        // Staying anomalous keeps the latch without a new edge
        assert_eq!(fault.observe(340.0), FaultTransition::Unchanged);
        assert!(fault.is_latched());
        assert_eq!(fault.consecutive(), 4);
    }

    #[test]
    fn single_clean_frame_clears() {
        let mut fault = FaultConfirmation::new(300.0, 2);
        fault.observe(500.0);
        fault.observe(500.0);
        assert!(fault.is_latched());

        assert_eq!(fault.observe(299.0), FaultTransition::Cleared);
        assert_eq!(fault.phase(), FaultPhase::Clear);
    }

    #[test]
    fn threshold_itself_is_normal() {
        let mut fault = FaultConfirmation::new(300.0, 1);
        assert_eq!(fault.observe(300.0), FaultTransition::Unchanged);
        assert!(!fault.is_anomalous(300.0));
        assert_eq!(fault.observe(300.01), FaultTransition::Raised);
    }

    #[test]
    fn zero_requirement_behaves_as_one() {
        let mut fault = FaultConfirmation::new(300.0, 0);
        assert_eq!(fault.observe(0.0), FaultTransition::Unchanged);
        assert_eq!(fault.observe(301.0), FaultTransition::Raised);
    }

    #[test]
    fn snapshot_reports_counters() {
        let mut fault = FaultConfirmation::new(300.0, 3);
        fault.observe(301.0);
        let state = fault.state(42);
        assert_eq!(state.consecutive_anomalous_count, 1);
        assert!(!state.latched);
        assert_eq!(state.last_publish_time, 42);
    }
}
