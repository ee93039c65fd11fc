//! Nearest-cluster anomaly classifier
//!
//! ## How it scores
//!
//! Training (off-device) clusters the feature vectors of healthy frames with
//! K-means and records each cluster's centre and radius. At runtime:
//!
//! ```text
//! score = scale × min over clusters ( ‖features − centre‖ − radius )
//! ```
//!
//! A frame that falls inside a cluster scores at or below zero; the further
//! outside the nearest cluster it lands, the higher the score. `scale` maps
//! the distance (in g) onto the range the threshold is expressed in.
//!
//! ## Memory Model
//!
//! ```text
//! Cluster:  6 × 4 (centre) + 4 (radius) = 28 bytes
//! Model:    MAX_CLUSTERS × 28 + 16      ≈ 240 bytes
//! Runtime:  one feature vector on the stack
//! ```

use heapless::Vec;
use vibeguard_core::{AnomalyScore, Classifier, ClassifierError};

use crate::features::{self, FeatureVector, FEATURES};
use crate::{MlError, MlResult};

/// Maximum clusters a model may hold
pub const MAX_CLUSTERS: usize = 8;

/// Default distance-to-score factor
pub const DEFAULT_SCALE: f32 = 1000.0;

/// One cluster of healthy operation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Cluster centre in feature space
    pub center: FeatureVector,
    /// Distance from the centre still considered inside (g)
    pub radius: f32,
}

impl Cluster {
    /// Build a cluster, rejecting non-finite or negative values
    pub fn new(center: FeatureVector, radius: f32) -> MlResult<Self> {
        if !center.iter().all(|v| v.is_finite()) {
            return Err(MlError::InvalidCluster {
                reason: "centre must be finite",
            });
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(MlError::InvalidCluster {
                reason: "radius must be finite and non-negative",
            });
        }
        Ok(Self { center, radius })
    }

    /// Signed distance from the cluster boundary
    pub fn excess(&self, features: &FeatureVector) -> f32 {
        features::distance(&self.center, features) - self.radius
    }
}

/// K-means anomaly scorer for fixed-length frames
#[derive(Debug, Clone)]
pub struct CentroidClassifier {
    clusters: Vec<Cluster, MAX_CLUSTERS>,
    expected_len: usize,
    scale: f32,
}

impl CentroidClassifier {
    /// Empty model for frames of `expected_len` interleaved values
    pub fn new(expected_len: usize) -> Self {
        Self {
            clusters: Vec::new(),
            expected_len,
            scale: DEFAULT_SCALE,
        }
    }

    /// Model tuned for a healthy motor with about 0.05 g of vibration per axis
    pub fn healthy_motor(expected_len: usize) -> Self {
        let rms = 0.05 * core::f32::consts::FRAC_1_SQRT_2;
        let running = Cluster {
            center: [rms, rms, rms, 0.1, 0.1, 0.1],
            radius: 0.02,
        };
        let stopped = Cluster {
            center: [0.0; FEATURES],
            radius: 0.02,
        };
        Self {
            clusters: Vec::from_slice(&[running, stopped]).unwrap_or_default(),
            ..Self::new(expected_len)
        }
    }

    /// Set the distance-to-score factor
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Add one cluster
    pub fn add_cluster(&mut self, cluster: Cluster) -> MlResult<()> {
        self.clusters
            .push(cluster)
            .map_err(|_| MlError::TooManyClusters { max: MAX_CLUSTERS })
    }

    /// Replace the model from a list of clusters
    pub fn load<I>(&mut self, clusters: I) -> MlResult<()>
    where
        I: IntoIterator<Item = Cluster>,
    {
        self.clusters.clear();
        for cluster in clusters {
            let cluster = Cluster::new(cluster.center, cluster.radius)?;
            self.add_cluster(cluster)?;
        }
        if self.clusters.is_empty() {
            return Err(MlError::EmptyModel);
        }
        Ok(())
    }

    /// Clusters in the model
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Interleaved values per frame the model accepts
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Distance-to-score factor
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Score a feature vector directly
    pub fn score_features(&self, features: &FeatureVector) -> Option<AnomalyScore> {
        self.clusters
            .iter()
            .map(|c| c.excess(features))
            .reduce(f32::min)
            .map(|excess| excess * self.scale)
    }
}

impl Classifier for CentroidClassifier {
    fn classify(&mut self, frame: &[f32]) -> Result<AnomalyScore, ClassifierError> {
        if frame.len() != self.expected_len {
            return Err(ClassifierError::LengthMismatch {
                expected: self.expected_len,
                actual: frame.len(),
            });
        }

        let features = features::extract(frame)?;
        let score = self.score_features(&features).ok_or(ClassifierError::Rejected {
            reason: "model has no clusters",
        })?;

        if !score.is_finite() {
            return Err(ClassifierError::NonFiniteScore);
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    /// `n` samples of a 3 Hz vibration at `amplitude` g on all axes, 100 Hz
    fn vibration(n: usize, amplitude: f32) -> std::vec::Vec<f32> {
        let mut frame = std::vec::Vec::with_capacity(n * 3);
        for i in 0..n {
            let phase = TAU * 3.0 * i as f32 / 100.0;
            frame.push(amplitude * libm::sinf(phase));
            frame.push(amplitude * libm::cosf(phase));
            frame.push(1.0 + amplitude * libm::sinf(phase + 1.0));
        }
        frame
    }

    #[test]
    fn healthy_motor_has_running_and_stopped_clusters() {
        let mut model = CentroidClassifier::healthy_motor(300);
        assert_eq!(model.clusters().len(), 2);
        assert_eq!(model.clusters()[1].center, [0.0; FEATURES]);
        assert_eq!(model.expected_len(), 300);
        assert_eq!(model.scale(), DEFAULT_SCALE);
        // Room left for site-specific clusters
        assert!(model
            .add_cluster(Cluster::new([0.2; FEATURES], 0.05).unwrap())
            .is_ok());
        assert_eq!(model.clusters().len(), 3);
    }

    #[test]
    fn healthy_frame_scores_below_threshold() {
        let mut model = CentroidClassifier::healthy_motor(300);
        let score = model.classify(&vibration(100, 0.05)).unwrap();
        assert!(score < 300.0, "score {}", score);
    }

    #[test]
    fn still_machine_is_normal() {
        let mut model = CentroidClassifier::healthy_motor(300);
        let score = model.classify(&vibration(100, 0.0)).unwrap();
        assert!(score <= 0.0);
    }

    #[test]
    fn heavy_vibration_is_anomalous() {
        let mut model = CentroidClassifier::healthy_motor(300);
        let score = model.classify(&vibration(100, 0.5)).unwrap();
        assert!(score > 300.0, "score {}", score);
    }

    #[test]
    fn wrong_length_rejected() {
        let mut model = CentroidClassifier::healthy_motor(300);
        let err = model.classify(&vibration(99, 0.05)).unwrap_err();
        assert_eq!(
            err,
            ClassifierError::LengthMismatch {
                expected: 300,
                actual: 297
            }
        );
    }

    #[test]
    fn empty_model_rejects() {
        let mut model = CentroidClassifier::new(300);
        assert!(matches!(
            model.classify(&vibration(100, 0.05)),
            Err(ClassifierError::Rejected { .. })
        ));
        assert_eq!(model.load([]), Err(MlError::EmptyModel));
    }

    #[test]
    fn non_finite_frame_rejected() {
        let mut model = CentroidClassifier::healthy_motor(6);
        let frame = [f32::NAN, 0.0, 1.0, 0.0, 0.0, 1.0];
        assert_eq!(model.classify(&frame), Err(ClassifierError::NonFiniteScore));
    }

    #[test]
    fn cluster_capacity_enforced() {
        let mut model = CentroidClassifier::new(300);
        let cluster = Cluster::new([0.0; FEATURES], 0.1).unwrap();
        for _ in 0..MAX_CLUSTERS {
            model.add_cluster(cluster).unwrap();
        }
        assert_eq!(
            model.add_cluster(cluster),
            Err(MlError::TooManyClusters { max: MAX_CLUSTERS })
        );
    }

    #[test]
    fn invalid_cluster_rejected() {
        assert!(Cluster::new([0.0; FEATURES], -1.0).is_err());
        assert!(Cluster::new([f32::NAN; FEATURES], 0.1).is_err());
    }
}
