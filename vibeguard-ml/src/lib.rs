//! Lightweight Vibration Anomaly Scoring for Edge Devices
//!
//! ## Overview
//!
//! This crate implements the [`Classifier`](vibeguard_core::Classifier) the
//! control loop consumes: one complete frame of interleaved 3-axis samples in,
//! one anomaly score out. Everything runs in fixed memory with no allocation
//! on the scoring path.
//!
//! ## Why nearest-cluster scoring?
//!
//! 1. **Unsupervised**: trained only on healthy machines, no fault labels
//! 2. **Tiny**: a handful of centres and radii, a few hundred bytes
//! 3. **Fast**: one pass over the frame plus `K` distances
//! 4. **Monotone**: the score grows with distance from normal, so a single
//!    threshold separates healthy from faulty
//!
//! ## Pipeline
//!
//! ```text
//! frame [x0 y0 z0 x1 y1 z1 ...]
//!        │
//!        ▼
//! features::extract ──► [rms_x rms_y rms_z p2p_x p2p_y p2p_z]
//!        │
//!        ▼
//! CentroidClassifier ──► scale × (distance to nearest cluster − radius)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use vibeguard_core::Classifier;
//! use vibeguard_ml::CentroidClassifier;
//!
//! let mut model = CentroidClassifier::healthy_motor(6);
//! let frame = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
//! let score = model.classify(&frame).unwrap();
//! assert!(score < 300.0);
//! ```
//!
//! ## Performance Characteristics
//!
//! | Operation        | Time          | Memory        |
//! |------------------|---------------|---------------|
//! | Extract features | O(N)          | O(1)          |
//! | Score            | O(K)          | O(1)          |
//! | Load model       | O(K)          | K × 28 bytes  |

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use thiserror_no_std::Error;

pub mod centroid;
pub mod features;

pub use centroid::{CentroidClassifier, Cluster, DEFAULT_SCALE, MAX_CLUSTERS};
pub use features::{FeatureVector, FEATURES};

/// Model construction errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlError {
    /// Model already holds the maximum number of clusters
    #[error("Model holds at most {max} clusters")]
    TooManyClusters {
        /// Capacity
        max: usize,
    },

    /// Model loaded without any cluster
    #[error("Model has no clusters")]
    EmptyModel,

    /// Cluster parameters out of range
    #[error("Invalid cluster: {reason}")]
    InvalidCluster {
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Result type for model operations
pub type MlResult<T> = Result<T, MlError>;
