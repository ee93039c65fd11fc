//! Detection Constants
//!
//! The classifier returns a k-means distance: the larger the distance, the
//! further the frame lies from every cluster learned on a healthy motor.

/// Anomaly distance above which a frame counts as anomalous.
///
/// A frame is anomalous only when `score > ANOMALY_THRESHOLD`; a score equal
/// to the threshold is normal.
pub const ANOMALY_THRESHOLD: f32 = 300.0;

/// Consecutive anomalous frames required before a fault is latched.
///
/// A single clean frame clears the latch again.
pub const CONSECUTIVE_FAULTS_THRESHOLD: u32 = 3;
