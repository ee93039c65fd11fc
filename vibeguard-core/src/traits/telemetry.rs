//! Telemetry sink abstraction

use crate::telemetry::TelemetryMessage;

/// What happened to a publish attempt
///
/// None of these outcomes is retried by the loop. Telemetry is at-most-once:
/// the next heartbeat or the next fault edge carries fresh state anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the transport
    Sent,
    /// Link not connected, message dropped
    Dropped,
    /// Transport refused the message (queue full, encoding error)
    Failed,
}

/// Best-effort publisher for status messages
pub trait TelemetrySink {
    /// Publish one message; must not block
    fn publish(&mut self, message: &TelemetryMessage) -> PublishOutcome;
}

impl<K: TelemetrySink + ?Sized> TelemetrySink for &mut K {
    fn publish(&mut self, message: &TelemetryMessage) -> PublishOutcome {
        (**self).publish(message)
    }
}
