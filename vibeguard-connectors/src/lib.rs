//! Telemetry Link for Device-to-Broker Communication
//!
//! ## Overview
//!
//! The control loop publishes a status message on a fault edge or a
//! heartbeat and must never wait on the network to do so. This crate splits
//! the link into two layers:
//!
//! - [`Transport`]: the protocol adapter. It opens a session, reports how the
//!   attempt went through [`LinkEvents`], and hands payloads to the protocol
//!   stack without blocking.
//! - [`LinkManager`]: the policy. It owns the connection state machine, the
//!   acknowledgement deadline and the single cancellable retry timer, and it
//!   implements [`TelemetrySink`](vibeguard_core::TelemetrySink) for the loop.
//!
//! ## MQTT
//!
//! **Why MQTT:**
//! - Persistent session, one handshake per connection
//! - Tiny header (2-5 bytes) next to a payload of at most 128 bytes
//! - Broker-side fan-out to dashboards and alerting
//!
//! Messages go out at QoS 1 (at least once) at the protocol level. The
//! application itself is at-most-once: a message the link could not hand to
//! the transport is dropped, never queued for later. A stale `FAULT` arriving
//! minutes late is worse than none, and the next heartbeat or edge carries
//! fresh state anyway.
//!
//! ## Retry Logic
//!
//! Fixed backoff, one outstanding retry:
//! ```text
//! disconnect / reject / timeout ──► wait RECONNECT_BACKOFF ──► connect
//! ```
//! Re-arming the timer replaces the pending retry, so a burst of disconnect
//! notifications schedules exactly one reconnect.
//!
//! ## Security Considerations
//!
//! 1. Never hard-code credentials; the node reads them from its environment
//! 2. Use TLS on untrusted networks (terminate at a local broker otherwise)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vibeguard_connectors::{LinkConfig, LinkManager, mqtt::{MqttConfig, MqttTransport}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mqtt = MqttConfig::new("broker.local", 1883).topic("plant/motor-7/status");
//! let link = LinkManager::start(MqttTransport::new(mqtt.clone())?, LinkConfig::from(&mqtt));
//!
//! link.request_connect();
//! if !link.wait_connected(Duration::from_secs(10)).await {
//!     log::warn!("broker not reachable yet, continuing unconnected");
//! }
//! # Ok(())
//! # }
//! ```

pub mod link;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use link::{LinkConfig, LinkEvent, LinkEvents, LinkManager};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttTransport};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// No session to the broker
    #[error("Not connected")]
    NotConnected,

    /// Transport's outgoing queue is full
    #[error("Buffer full")]
    BufferFull,

    /// Broker did not answer in time
    #[error("Timeout")]
    Timeout,

    /// Broker refused the session
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Protocol-level failure
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Invalid transport configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Delivery guarantee requested from the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    /// Fire and forget
    AtMostOnce,
    /// Acknowledged delivery, duplicates possible
    #[default]
    AtLeastOnce,
    /// Four-way handshake
    ExactlyOnce,
}

/// Protocol adapter driven by [`LinkManager`]
///
/// `connect` starts one attempt and returns once it is under way. The outcome
/// (acknowledged, refused, failed, later lost) is reported through `events`;
/// an `Err` return means the attempt never started and counts as failed.
/// A new `connect` abandons whatever the previous one left running.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Start a connection attempt
    async fn connect(&self, events: LinkEvents) -> Result<(), ConnectorError>;

    /// Hand one payload to the protocol stack without blocking
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), ConnectorError>;

    /// Close the session
    async fn disconnect(&self) -> Result<(), ConnectorError>;

    /// Identity presented to the remote end, for logs
    fn identity(&self) -> Option<&str> {
        None
    }
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages handed to the transport
    pub messages_sent: u64,
    /// Messages dropped because the link was down
    pub messages_dropped: u64,
    /// Messages the transport refused
    pub messages_failed: u64,
    /// Total payload bytes handed to the transport
    pub bytes_sent: u64,
    /// Connect attempts started
    pub connect_attempts: u32,
    /// Sessions established after the first one
    pub reconnections: u32,
    /// Attempts the broker refused
    pub rejections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
