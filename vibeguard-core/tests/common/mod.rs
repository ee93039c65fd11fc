//! Shared fixtures for core integration tests

#![allow(dead_code)]

use vibeguard_core::{
    AnomalyScore, Classifier, ClassifierError, PublishPolicy, Sample, Status, FaultConfirmation,
    Timestamp, WindowBuffer,
};

/// Deterministic sample for index `i`
pub fn sample(i: usize) -> Sample {
    let t = i as f32;
    Sample::new(t * 0.001, -t * 0.002, 1.0 + t * 0.0005)
}

/// Classifier that replays a fixed list of scores, one per frame
pub struct ScriptedClassifier {
    scores: Vec<AnomalyScore>,
    next: usize,
    pub frames_seen: Vec<usize>,
}

impl ScriptedClassifier {
    pub fn new(scores: &[AnomalyScore]) -> Self {
        Self {
            scores: scores.to_vec(),
            next: 0,
            frames_seen: Vec::new(),
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, frame: &[f32]) -> Result<AnomalyScore, ClassifierError> {
        self.frames_seen.push(frame.len());
        let score = self
            .scores
            .get(self.next)
            .copied()
            .ok_or(ClassifierError::Rejected { reason: "script exhausted" })?;
        self.next += 1;
        Ok(score)
    }
}

/// Window, hysteresis and publish policy wired together without I/O
pub struct Pipeline<const N: usize> {
    pub window: WindowBuffer<N>,
    pub fault: FaultConfirmation,
    pub policy: PublishPolicy,
}

impl<const N: usize> Pipeline<N> {
    pub fn new(threshold: AnomalyScore, required: u32, heartbeat_ms: u64) -> Self {
        Self {
            window: WindowBuffer::new(),
            fault: FaultConfirmation::new(threshold, required),
            policy: PublishPolicy::new(heartbeat_ms),
        }
    }

    /// Feed one sample; returns the publish decision if a frame completed
    pub fn push<C: Classifier>(
        &mut self,
        classifier: &mut C,
        sample: Sample,
        now: Timestamp,
    ) -> Option<Status> {
        let frame = self.window.append(sample)?;
        let score = classifier.classify(frame.as_interleaved()).ok()?;
        let transition = self.fault.observe(score);
        self.policy.decide(transition, self.fault.is_latched(), now)
    }
}
