//! Sampling Scheduler
//!
//! ## Overview
//!
//! A periodic timer wakes the control loop once per sample period. The wake
//! is a channel of capacity one:
//!
//! ```text
//!   interval ──try_send──► [ 1 slot ] ──recv──► control loop
//!                │
//!                └── slot full: tick dropped, counted
//! ```
//!
//! If the loop is still busy when the next period elapses (a slow inference,
//! a blocked publish), the tick is dropped instead of queued. Ticks never
//! pile up, so the loop never runs a burst of catch-up iterations after a
//! stall. Missed timer deadlines are skipped as well, not replayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vibeguard_core::constants::sampling::{tick_period_us, MAX_SAMPLE_RATE_HZ};
use vibeguard_core::ConfigError;

/// One wake of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Timer period this tick belongs to, starting at 1
    pub sequence: u64,
}

/// Scheduler counters
///
/// Updated with relaxed ordering; values are for reporting only.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    issued: AtomicU64,
    dropped: AtomicU64,
}

impl SchedulerStats {
    /// Ticks delivered to the loop
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the previous one was still pending
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer side of the wake channel
#[derive(Debug)]
pub struct TickReceiver {
    rx: mpsc::Receiver<Tick>,
}

impl TickReceiver {
    /// Wait for the next tick; `None` once the scheduler has stopped
    pub async fn recv(&mut self) -> Option<Tick> {
        self.rx.recv().await
    }

    /// Pending tick, if any
    pub fn try_recv(&mut self) -> Option<Tick> {
        self.rx.try_recv().ok()
    }
}

/// Control handle for a running scheduler; stops it when dropped
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
    stats: Arc<SchedulerStats>,
    period: Duration,
}

impl SchedulerHandle {
    /// Ticks dropped so far
    pub fn dropped(&self) -> u64 {
        self.stats.dropped()
    }

    /// Ticks delivered so far
    pub fn issued(&self) -> u64 {
        self.stats.issued()
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop issuing ticks; the receiver drains and then yields `None`
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Periodic wake source
pub struct Scheduler;

impl Scheduler {
    /// Start ticking at `rate_hz` on the current tokio runtime
    ///
    /// Rates of zero or above [`MAX_SAMPLE_RATE_HZ`] are rejected.
    pub fn start(rate_hz: u32) -> Result<(TickReceiver, SchedulerHandle), ConfigError> {
        let period_us = tick_period_us(rate_hz).ok_or(ConfigError::Invalid {
            field: "sample_rate_hz",
            reason: "must be between 1 Hz and 1 MHz",
        })?;
        Self::start_with_period(Duration::from_micros(period_us))
    }

    /// Start ticking every `period`; a zero period is rejected
    pub fn start_with_period(
        period: Duration,
    ) -> Result<(TickReceiver, SchedulerHandle), ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::Invalid {
                field: "period",
                reason: "must be non-zero",
            });
        }

        let (tx, rx) = mpsc::channel(1);
        let stats = Arc::new(SchedulerStats::default());
        let counters = Arc::clone(&stats);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut sequence = 0u64;

            loop {
                interval.tick().await;
                sequence += 1;
                match tx.try_send(Tick { sequence }) {
                    Ok(()) => {
                        counters.issued.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Full(_)) => {
                        counters.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!("tick {} dropped, loop busy", sequence);
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        Ok((TickReceiver { rx }, SchedulerHandle { task, stats, period }))
    }
}
