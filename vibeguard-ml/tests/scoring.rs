//! Integration tests for frame scoring

use proptest::prelude::*;
use vibeguard_core::{constants::FRAME_VALUES, Classifier, Sample, WindowBuffer};
use vibeguard_ml::{CentroidClassifier, Cluster, FEATURES};

/// Fill a full-length window with a 3 Hz vibration of `amplitude` g
fn classify_vibration(model: &mut CentroidClassifier, amplitude: f32) -> f32 {
    let mut window = WindowBuffer::<100>::new();
    for i in 0..100 {
        let phase = core::f32::consts::TAU * 3.0 * i as f32 / 100.0;
        let sample = Sample::new(
            amplitude * phase.sin(),
            amplitude * phase.cos(),
            1.0 - amplitude * phase.sin(),
        );
        if let Some(frame) = window.append(sample) {
            return model.classify(frame.as_interleaved()).unwrap();
        }
    }
    unreachable!("window of 100 completes on the 100th sample")
}

#[test]
fn test_window_frames_are_accepted() {
    let mut model = CentroidClassifier::healthy_motor(FRAME_VALUES);
    let score = classify_vibration(&mut model, 0.05);
    assert!(score < 300.0);
}

#[test]
fn test_loaded_model_replaces_default() {
    let mut model = CentroidClassifier::healthy_motor(FRAME_VALUES);
    let only = Cluster::new([0.0; FEATURES], 0.0).unwrap();
    model.load([only]).unwrap();
    assert_eq!(model.clusters().len(), 1);

    // Healthy vibration now sits outside the only (still) cluster
    let score = classify_vibration(&mut model, 0.05);
    assert!(score > 100.0);
}

proptest! {
    #[test]
    fn prop_score_grows_with_vibration(a in 0.1f32..1.0, extra in 0.05f32..1.0) {
        let mut model = CentroidClassifier::healthy_motor(FRAME_VALUES);
        let low = classify_vibration(&mut model, a);
        let high = classify_vibration(&mut model, a + extra);
        prop_assert!(high > low, "{} vs {}", low, high);
    }
}
