//! Spectral-free vibration features
//!
//! A frame of `N` interleaved triples is reduced to two statistics per axis:
//!
//! | Index | Feature             |
//! |-------|---------------------|
//! | 0..3  | RMS of X, Y, Z      |
//! | 3..6  | peak-to-peak X, Y, Z |
//!
//! The per-axis mean is removed before the RMS, so static gravity on one axis
//! does not dominate the vector. Both statistics grow with vibration energy;
//! an unbalanced or loose machine moves them well away from the trained
//! clusters.

use vibeguard_core::constants::AXES;
use vibeguard_core::ClassifierError;

/// Number of features per frame
pub const FEATURES: usize = AXES * 2;

/// Feature vector for one frame
pub type FeatureVector = [f32; FEATURES];

/// Reduce an interleaved frame to its feature vector
///
/// The frame must hold at least one complete `[x, y, z]` triple and nothing
/// else.
pub fn extract(frame: &[f32]) -> Result<FeatureVector, ClassifierError> {
    if frame.is_empty() || frame.len() % AXES != 0 {
        return Err(ClassifierError::Rejected {
            reason: "frame is not a whole number of samples",
        });
    }

    let samples = (frame.len() / AXES) as f32;
    let mut features = [0.0; FEATURES];

    for axis in 0..AXES {
        let values = || frame.iter().skip(axis).step_by(AXES).copied();

        let mean = values().sum::<f32>() / samples;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum_sq = 0.0;

        for v in values() {
            let centred = v - mean;
            sum_sq += centred * centred;
            min = min.min(v);
            max = max.max(v);
        }

        features[axis] = libm::sqrtf(sum_sq / samples);
        features[AXES + axis] = max - min;
    }

    Ok(features)
}

/// Euclidean distance between two feature vectors
pub fn distance(a: &FeatureVector, b: &FeatureVector) -> f32 {
    let sum_sq: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    libm::sqrtf(sum_sq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_frame_has_zero_energy() {
        let frame = [0.0, 0.0, 1.0].repeat(50);
        let features = extract(&frame).unwrap();
        assert_eq!(features, [0.0; FEATURES]);
    }

    #[test]
    fn square_wave_statistics() {
        // X alternates between -1 and +1; Y and Z are still
        let mut frame = Vec::new();
        for i in 0..10 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            frame.extend_from_slice(&[x, 0.5, 1.0]);
        }

        let features = extract(&frame).unwrap();
        assert!((features[0] - 1.0).abs() < 1e-6);
        assert_eq!(features[1], 0.0);
        assert!((features[3] - 2.0).abs() < 1e-6);
        assert_eq!(features[4], 0.0);
    }

    #[test]
    fn partial_triple_rejected() {
        assert!(extract(&[0.0, 1.0]).is_err());
        assert!(extract(&[]).is_err());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = [0.0; FEATURES];
        let mut b = [0.0; FEATURES];
        b[0] = 3.0;
        b[5] = 4.0;
        assert!((distance(&a, &b) - 5.0).abs() < 1e-6);
    }
}
