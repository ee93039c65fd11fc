//! Classifier abstraction
//!
//! The model is opaque: feature extraction, DSP and the trained clusters all
//! live behind [`Classifier::classify`]. The loop only guarantees that the
//! slice it hands over is a complete frame of interleaved `[x, y, z]` triples.

use crate::errors::ClassifierError;

/// Anomaly distance for one frame (larger = more anomalous)
pub type AnomalyScore = f32;

/// Maps one complete frame to an anomaly score
pub trait Classifier {
    /// Score a frame laid out as `[x0, y0, z0, x1, y1, z1, ...]`
    ///
    /// An error means the frame is discarded for this cycle: no fault state
    /// update and no publish follow from it.
    fn classify(&mut self, frame: &[f32]) -> Result<AnomalyScore, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for &mut C {
    fn classify(&mut self, frame: &[f32]) -> Result<AnomalyScore, ClassifierError> {
        (**self).classify(frame)
    }
}
