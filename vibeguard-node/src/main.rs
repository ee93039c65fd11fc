//! `vibeguard` device binary
//!
//! Configuration: `VIBEGUARD_CONFIG=/etc/vibeguard.json`, log level through
//! `RUST_LOG` (default `info`).

use std::time::Duration;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{info, warn};
use vibeguard_connectors::mqtt::MqttTransport;
use vibeguard_connectors::{LinkConfig, LinkManager};
use vibeguard_core::constants::{FRAME_LEN, FRAME_VALUES};
use vibeguard_core::MonotonicTime;
use vibeguard_node::{ControlLoop, NodeConfig, Scheduler, SimulatedSource, WatchdogMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = NodeConfig::load()?;
    let control = &config.control;
    info!(
        "VibeGuard {} starting: {} Hz, {} samples/frame, threshold {:.1}, {} frames to latch",
        env!("CARGO_PKG_VERSION"),
        control.sample_rate_hz,
        FRAME_LEN,
        control.threshold,
        control.consecutive_faults
    );

    // Link first: the boot connect wait must finish before the watchdog runs
    let transport = MqttTransport::new(config.mqtt.clone()).context("creating MQTT transport")?;
    info!(
        "MQTT client [{}] -> {}:{} topic {}",
        transport.client_id(),
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.topic
    );
    let link_config = LinkConfig::from(&config.mqtt)
        .backoff(Duration::from_millis(control.reconnect_backoff_ms))
        .connect_timeout(Duration::from_millis(control.connect_wait_ms));
    let link = LinkManager::start(transport, link_config);
    link.request_connect();
    if !link
        .wait_connected(Duration::from_millis(control.connect_wait_ms))
        .await
    {
        warn!(
            "Broker not reachable within {} ms, continuing offline",
            control.connect_wait_ms
        );
    }

    let classifier = config
        .classifier
        .build(FRAME_VALUES)
        .context("building classifier")?;
    let source = SimulatedSource::new(config.simulation.clone(), control.sample_rate_hz);
    let watchdog = WatchdogMonitor::install(&config.watchdog, control.watchdog_window_ms);

    let mut control_loop: ControlLoop<_, _, _, FRAME_LEN> =
        ControlLoop::new(control, source, classifier, link.clone(), watchdog);
    let (mut ticks, scheduler) =
        Scheduler::start(control.sample_rate_hz).context("starting scheduler")?;
    let clock = MonotonicTime::new();

    tokio::select! {
        _ = control_loop.run(&mut ticks, &clock) => {
            warn!("Scheduler stopped unexpectedly");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            info!("Shutdown requested");
        }
    }

    scheduler.stop();
    link.shutdown().await;

    let stats = control_loop.stats();
    let link_stats = link.stats();
    info!(
        "Stopped: {} ticks ({} dropped), {} frames, {} sensor failures, {} rejected frames",
        stats.ticks,
        scheduler.dropped(),
        stats.frames_classified,
        stats.sensor_failures,
        stats.classifier_rejections
    );
    info!(
        "Telemetry: {} sent, {} dropped, {} failed; {} connect attempts, {} reconnections",
        stats.publishes,
        stats.publishes_dropped,
        stats.publish_failures,
        link_stats.connect_attempts,
        link_stats.reconnections
    );
    Ok(())
}
