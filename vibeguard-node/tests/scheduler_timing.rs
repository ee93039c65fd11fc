//! Scheduler behaviour under a stalled loop, on tokio's paused clock

use std::time::Duration;

use vibeguard_core::{
    AnomalyScore, Classifier, ClassifierError, FixedTime, LoopConfig, PublishOutcome, Sample,
    SampleSource, SensorError, TelemetryMessage, TelemetrySink,
};
use vibeguard_node::{ControlLoop, Scheduler, Tick, WatchdogMonitor};

#[tokio::test(start_paused = true)]
async fn busy_loop_drops_ticks_instead_of_queueing() {
    let (mut ticks, scheduler) = Scheduler::start(100).unwrap();

    // Loop stalls for ten periods without receiving
    tokio::time::sleep(Duration::from_millis(105)).await;

    assert_eq!(ticks.try_recv(), Some(Tick { sequence: 1 }));
    assert_eq!(ticks.try_recv(), None);
    assert_eq!(scheduler.issued(), 1);
    assert!(scheduler.dropped() >= 9);

    // Once the loop is back, ticks flow again in sequence order
    let next = ticks.recv().await.unwrap();
    assert!(next.sequence > 1);
    assert_eq!(scheduler.issued(), 2);
}

struct Still;

impl SampleSource for Still {
    fn read(&mut self) -> nb::Result<Sample, SensorError> {
        Ok(Sample::new(0.0, 0.0, 1.0))
    }
}

struct Quiet;

impl Classifier for Quiet {
    fn classify(&mut self, _frame: &[f32]) -> Result<AnomalyScore, ClassifierError> {
        Ok(1.0)
    }
}

struct Discard;

impl TelemetrySink for Discard {
    fn publish(&mut self, _message: &TelemetryMessage) -> PublishOutcome {
        PublishOutcome::Dropped
    }
}

#[tokio::test(start_paused = true)]
async fn run_steps_once_per_tick() {
    let (mut ticks, scheduler) = Scheduler::start(100).unwrap();
    let clock = FixedTime::new(0);
    let mut control: ControlLoop<_, _, _, 4> = ControlLoop::new(
        &LoopConfig::default(),
        Still,
        Quiet,
        Discard,
        WatchdogMonitor::unguarded(),
    );

    let stopped =
        tokio::time::timeout(Duration::from_millis(95), control.run(&mut ticks, &clock)).await;
    assert!(stopped.is_err(), "scheduler still running");

    // Ticks at 0, 10, ..., 90 ms
    let stats = control.stats().clone();
    assert!((9..=10).contains(&stats.ticks), "ticks = {}", stats.ticks);
    assert_eq!(stats.frames_classified, stats.ticks / 4);
    assert_eq!(scheduler.dropped(), 0);

    scheduler.stop();
    let drained = control.run(&mut ticks, &clock).await;
    assert!(drained.ticks >= stats.ticks);
}
