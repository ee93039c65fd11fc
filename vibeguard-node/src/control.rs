//! Acquisition-to-publish control loop
//!
//! One iteration per scheduler tick:
//!
//! ```text
//!   read sample ──► append to window ──► frame full? ──► classify
//!        │                 │                                │
//!        │ error: skip     │ no: wait                       ▼
//!        │                 │                      fault hysteresis
//!        │                 │                                │
//!        │                 │                                ▼
//!        │                 │                         publish policy ──► sink
//!        ▼                 ▼                                ▼
//!   ─────────────────── feed watchdog ───────────────────────────
//! ```
//!
//! Every path ends with a watchdog feed, including skipped ticks and rejected
//! frames: the watchdog guards liveness of the loop, not success of an
//! iteration. A failing sensor, a classifier error or a dead link only costs
//! that one iteration.

use log::{debug, error, info, warn};
use vibeguard_core::{
    AnomalyScore, Classifier, ClassifierError, FaultConfirmation, FaultPhase, FaultTransition,
    LoopConfig, LoopFault, PublishOutcome, PublishPolicy, Sample, SampleSource, SensorError,
    Status, TelemetryMessage, TelemetrySink, TimeSource, Timestamp, WindowBuffer,
};

use crate::scheduler::TickReceiver;
use crate::watchdog::WatchdogMonitor;

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Iteration {
    /// No sample this tick (sensor busy or failed)
    SensorSkipped,
    /// Sample stored, frame not yet complete
    Buffered {
        /// Samples in the frame in progress
        pending: usize,
    },
    /// Frame complete but the classifier refused it
    Rejected,
    /// Frame scored
    Classified {
        /// Anomaly score of the frame
        score: AnomalyScore,
        /// Latch edge caused by this frame
        transition: FaultTransition,
        /// Status published for this frame and what became of it
        published: Option<(Status, PublishOutcome)>,
    },
}

/// Loop counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Iterations run
    pub ticks: u64,
    /// Ticks without a sample
    pub sensor_failures: u64,
    /// Frames that produced a score
    pub frames_classified: u64,
    /// Frames the classifier refused
    pub classifier_rejections: u64,
    /// Status messages handed to the transport
    pub publishes: u64,
    /// Status messages dropped while the link was down
    pub publishes_dropped: u64,
    /// Status messages the transport refused
    pub publish_failures: u64,
}

/// The device control loop over its collaborators
///
/// `N` is the frame length in samples.
pub struct ControlLoop<S, C, K, const N: usize> {
    source: S,
    classifier: C,
    sink: K,
    watchdog: WatchdogMonitor,
    window: WindowBuffer<N>,
    fault: FaultConfirmation,
    policy: PublishPolicy,
    threshold: AnomalyScore,
    stats: LoopStats,
    last_fault: Option<LoopFault>,
}

impl<S, C, K, const N: usize> ControlLoop<S, C, K, N>
where
    S: SampleSource,
    C: Classifier,
    K: TelemetrySink,
{
    /// Assemble a loop; state starts Clear with an empty window
    pub fn new(
        config: &LoopConfig,
        source: S,
        classifier: C,
        sink: K,
        watchdog: WatchdogMonitor,
    ) -> Self {
        Self {
            source,
            classifier,
            sink,
            watchdog,
            window: WindowBuffer::new(),
            fault: FaultConfirmation::new(config.threshold, config.consecutive_faults),
            policy: PublishPolicy::new(config.heartbeat_ms),
            threshold: config.threshold,
            stats: LoopStats::default(),
            last_fault: None,
        }
    }

    /// Run one iteration at time `now` and feed the watchdog
    pub fn step(&mut self, now: Timestamp) -> Iteration {
        let iteration = self.iterate(now);
        self.watchdog.feed();
        iteration
    }

    /// Step once per tick until the scheduler stops
    pub async fn run<T: TimeSource>(&mut self, ticks: &mut TickReceiver, clock: &T) -> LoopStats {
        while let Some(tick) = ticks.recv().await {
            let iteration = self.step(clock.now());
            if let Iteration::Classified { .. } = iteration {
                debug!("tick {}: {:?}", tick.sequence, iteration);
            }
        }
        self.stats.clone()
    }

    fn iterate(&mut self, now: Timestamp) -> Iteration {
        self.stats.ticks += 1;

        let sample = match self.read_sample() {
            Ok(sample) => sample,
            Err(fault) => {
                self.stats.sensor_failures += 1;
                self.report(fault);
                return Iteration::SensorSkipped;
            }
        };

        let score = match self.window.append(sample) {
            None => {
                return Iteration::Buffered {
                    pending: self.window.len(),
                }
            }
            Some(frame) => self.classifier.classify(frame.as_interleaved()),
        };

        let score = match score.and_then(finite_score) {
            Ok(score) => score,
            Err(err) => {
                self.stats.classifier_rejections += 1;
                self.report(err.into());
                return Iteration::Rejected;
            }
        };
        self.stats.frames_classified += 1;

        let transition = self.fault.observe(score);
        let latched = self.fault.is_latched();
        info!("score={:.2} {}", score, if latched { "FAULT" } else { "OK" });
        match transition {
            FaultTransition::Raised => warn!(
                "Fault latched after {} anomalous frames",
                self.fault.consecutive()
            ),
            FaultTransition::Cleared => info!("Fault cleared"),
            FaultTransition::Unchanged => {}
        }

        let published = match self.policy.decide(transition, latched, now) {
            Some(status) => {
                let message = TelemetryMessage::new(score, self.threshold, status);
                let outcome = self.sink.publish(&message);
                match outcome {
                    PublishOutcome::Sent => self.stats.publishes += 1,
                    PublishOutcome::Dropped => {
                        self.stats.publishes_dropped += 1;
                        debug!("{} not published, link down", status.as_str());
                    }
                    PublishOutcome::Failed => {
                        self.stats.publish_failures += 1;
                        self.report(LoopFault::Transport {
                            reason: "publish refused",
                        });
                    }
                }
                Some((status, outcome))
            }
            None => None,
        };

        Iteration::Classified {
            score,
            transition,
            published,
        }
    }

    /// One sample, or the sensor fault that skips this tick
    fn read_sample(&mut self) -> Result<Sample, LoopFault> {
        match self.source.read() {
            Ok(sample) if sample.is_finite() => Ok(sample),
            Ok(_) => Err(SensorError::InvalidValue.into()),
            Err(nb::Error::WouldBlock) => Err(SensorError::NotReady.into()),
            Err(nb::Error::Other(err)) => Err(err.into()),
        }
    }

    /// Log a recovered fault and remember it
    fn report(&mut self, fault: LoopFault) {
        match fault {
            LoopFault::Sensor(SensorError::NotReady) => debug!("{}, tick skipped", fault),
            LoopFault::Sensor(_) => warn!("{}, tick skipped", fault),
            LoopFault::Classifier(_) => warn!("{}, frame discarded", fault),
            LoopFault::Transport { .. } => warn!("{}, status not delivered", fault),
            LoopFault::Liveness => error!("{}", fault),
        }
        self.last_fault = Some(fault);
    }

    /// Most recent recovered fault
    pub fn last_fault(&self) -> Option<LoopFault> {
        self.last_fault
    }

    /// Counters so far
    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Current debounce phase
    pub fn phase(&self) -> FaultPhase {
        self.fault.phase()
    }

    /// Publish policy bookkeeping
    pub fn policy(&self) -> &PublishPolicy {
        &self.policy
    }

    /// The watchdog monitor
    pub fn watchdog(&self) -> &WatchdogMonitor {
        &self.watchdog
    }

    /// Samples in the frame in progress
    pub fn pending(&self) -> usize {
        self.window.len()
    }

    /// The telemetry sink
    pub fn sink(&self) -> &K {
        &self.sink
    }
}

fn finite_score(score: AnomalyScore) -> Result<AnomalyScore, ClassifierError> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(ClassifierError::NonFiniteScore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(Sample);

    impl SampleSource for Constant {
        fn read(&mut self) -> nb::Result<Sample, SensorError> {
            Ok(self.0)
        }
    }

    struct Fixed(AnomalyScore);

    impl Classifier for Fixed {
        fn classify(&mut self, frame: &[f32]) -> Result<AnomalyScore, ClassifierError> {
            assert_eq!(frame.len(), 4 * 3);
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<TelemetryMessage>);

    impl TelemetrySink for Recorder {
        fn publish(&mut self, message: &TelemetryMessage) -> PublishOutcome {
            self.0.push(*message);
            PublishOutcome::Sent
        }
    }

    fn control(score: AnomalyScore) -> ControlLoop<Constant, Fixed, Recorder, 4> {
        ControlLoop::new(
            &LoopConfig::default(),
            Constant(Sample::new(0.0, 0.0, 1.0)),
            Fixed(score),
            Recorder::default(),
            WatchdogMonitor::unguarded(),
        )
    }

    #[test]
    fn classifies_every_fourth_tick() {
        let mut control = control(10.0);
        for i in 1..4 {
            assert_eq!(control.step(0), Iteration::Buffered { pending: i });
        }
        assert!(matches!(control.step(0), Iteration::Classified { .. }));
        assert_eq!(control.pending(), 0);
        assert_eq!(control.stats().frames_classified, 1);
    }

    #[test]
    fn latches_on_third_anomalous_frame() {
        let mut control = control(500.0);
        let mut raised_at = None;
        for tick in 1..=12u64 {
            if let Iteration::Classified { transition: FaultTransition::Raised, published, .. } =
                control.step(tick * 10)
            {
                raised_at = Some(tick);
                assert_eq!(published, Some((Status::Fault, PublishOutcome::Sent)));
            }
        }
        assert_eq!(raised_at, Some(12));
        assert_eq!(control.phase(), FaultPhase::Latched);
        assert_eq!(control.sink().0.len(), 1);
        assert_eq!(control.sink().0[0].status, Status::Fault);
    }

    /// Plays back readings, then repeats a still sample
    struct Readings(Vec<nb::Result<Sample, SensorError>>);

    impl SampleSource for Readings {
        fn read(&mut self) -> nb::Result<Sample, SensorError> {
            if self.0.is_empty() {
                Ok(Sample::new(0.0, 0.0, 1.0))
            } else {
                self.0.remove(0)
            }
        }
    }

    struct Refusing;

    impl TelemetrySink for Refusing {
        fn publish(&mut self, _message: &TelemetryMessage) -> PublishOutcome {
            PublishOutcome::Failed
        }
    }

    #[test]
    fn sensor_faults_are_classified() {
        let mut control: ControlLoop<_, _, _, 4> = ControlLoop::new(
            &LoopConfig::default(),
            Readings(vec![
                Ok(Sample::new(f32::NAN, 0.0, 1.0)),
                Err(nb::Error::WouldBlock),
                Err(nb::Error::Other(SensorError::Bus { reason: "nack" })),
            ]),
            Fixed(10.0),
            Recorder::default(),
            WatchdogMonitor::unguarded(),
        );

        assert_eq!(control.step(10), Iteration::SensorSkipped);
        assert_eq!(
            control.last_fault(),
            Some(LoopFault::Sensor(SensorError::InvalidValue))
        );
        assert_eq!(control.pending(), 0);

        assert_eq!(control.step(20), Iteration::SensorSkipped);
        assert_eq!(
            control.last_fault(),
            Some(LoopFault::Sensor(SensorError::NotReady))
        );

        assert_eq!(control.step(30), Iteration::SensorSkipped);
        assert_eq!(
            control.last_fault(),
            Some(LoopFault::Sensor(SensorError::Bus { reason: "nack" }))
        );

        assert_eq!(control.step(40), Iteration::Buffered { pending: 1 });
        assert_eq!(control.stats().sensor_failures, 3);
        assert!(control.last_fault().map_or(false, |f| f.is_recoverable()));
    }

    #[test]
    fn non_finite_score_is_a_rejection() {
        let mut control = control(f32::NAN);
        for _ in 0..4 {
            control.step(0);
        }
        assert_eq!(control.stats().classifier_rejections, 1);
        assert_eq!(control.stats().frames_classified, 0);
        assert_eq!(
            control.last_fault(),
            Some(LoopFault::Classifier(ClassifierError::NonFiniteScore))
        );
        assert_eq!(control.phase(), FaultPhase::Clear);
        assert!(control.sink().0.is_empty());
    }

    #[test]
    fn refused_publish_is_a_transport_fault() {
        let mut control: ControlLoop<_, _, _, 4> = ControlLoop::new(
            &LoopConfig::default().with_consecutive_faults(1),
            Constant(Sample::new(0.0, 0.0, 1.0)),
            Fixed(500.0),
            Refusing,
            WatchdogMonitor::unguarded(),
        );
        for tick in 1..=4u64 {
            control.step(tick * 10);
        }
        assert_eq!(control.stats().publish_failures, 1);
        assert_eq!(
            control.last_fault(),
            Some(LoopFault::Transport {
                reason: "publish refused"
            })
        );
        assert_eq!(control.phase(), FaultPhase::Latched);
    }
}
