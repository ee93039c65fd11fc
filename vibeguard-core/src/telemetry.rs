//! Telemetry messages and the publish policy
//!
//! ## When to publish
//!
//! [`PublishPolicy::decide`] runs once per classified frame, after the fault
//! state machine has seen the score:
//!
//! | Latch edge | Latched | Heartbeat elapsed | Publish        |
//! |------------|---------|-------------------|----------------|
//! | Raised     | yes     | any               | `FAULT`        |
//! | Cleared    | no      | any               | `OK`           |
//! | none       | no      | yes (`>`)         | `OK` heartbeat |
//! | none       | yes     | any               | nothing        |
//! | none       | no      | no                | nothing        |
//!
//! Every publish decision stamps `last_publish_time`, whether or not the link
//! was up. A latched fault is announced once, not repeated every frame.
//!
//! ## Wire format
//!
//! ```text
//! {"score":312.47,"threshold":300.00,"status":"FAULT"}
//! ```
//!
//! ASCII, two decimals, no whitespace, at most
//! [`MAX_PAYLOAD_LEN`](crate::constants::MAX_PAYLOAD_LEN) bytes.

use core::fmt::{self, Write};

use crate::constants::MAX_PAYLOAD_LEN;
use crate::errors::EncodeError;
use crate::fault::FaultTransition;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::AnomalyScore;

/// Encoded payload buffer
pub type Payload = heapless::String<MAX_PAYLOAD_LEN>;

/// Published device status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// No confirmed fault
    #[cfg_attr(feature = "serde", serde(rename = "OK"))]
    Ok,
    /// Fault confirmed
    #[cfg_attr(feature = "serde", serde(rename = "FAULT"))]
    Fault,
}

impl Status {
    /// Wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Fault => "FAULT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status report, built fresh for each publish decision
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TelemetryMessage {
    /// Score of the frame that triggered the publish
    pub score: AnomalyScore,
    /// Threshold in force
    pub threshold: AnomalyScore,
    /// Reported status
    pub status: Status,
}

impl TelemetryMessage {
    /// Build a message
    pub const fn new(score: AnomalyScore, threshold: AnomalyScore, status: Status) -> Self {
        Self {
            score,
            threshold,
            status,
        }
    }

    /// Encode into the fixed-format ASCII payload
    pub fn encode(&self) -> Result<Payload, EncodeError> {
        let mut payload = Payload::new();
        write!(
            payload,
            "{{\"score\":{:.2},\"threshold\":{:.2},\"status\":\"{}\"}}",
            self.score, self.threshold, self.status
        )
        .map_err(|_| EncodeError::Overflow { max: MAX_PAYLOAD_LEN })?;
        Ok(payload)
    }
}

/// Decides when a status message goes out
#[derive(Debug, Clone)]
pub struct PublishPolicy {
    heartbeat_ms: u64,
    last_publish: Timestamp,
}

impl PublishPolicy {
    /// Policy with the given heartbeat interval
    ///
    /// The boot instant counts as the last publish, so the first heartbeat
    /// comes one interval after boot.
    pub fn new(heartbeat_ms: u64) -> Self {
        Self {
            heartbeat_ms,
            last_publish: 0,
        }
    }

    /// Decide for one classified frame and record the publish time
    pub fn decide(
        &mut self,
        transition: FaultTransition,
        latched: bool,
        now: Timestamp,
    ) -> Option<Status> {
        let status = match transition {
            FaultTransition::Raised => Some(Status::Fault),
            FaultTransition::Cleared => Some(Status::Ok),
            FaultTransition::Unchanged if !latched && self.heartbeat_due(now) => Some(Status::Ok),
            FaultTransition::Unchanged => None,
        };

        if status.is_some() {
            self.last_publish = now;
        }
        status
    }

    /// Strictly more than one heartbeat interval since the last publish
    pub fn heartbeat_due(&self, now: Timestamp) -> bool {
        elapsed_ms(self.last_publish, now) > self.heartbeat_ms
    }

    /// Time of the last publish decision
    pub fn last_publish(&self) -> Timestamp {
        self.last_publish
    }

    /// Configured heartbeat interval
    pub fn heartbeat_ms(&self) -> u64 {
        self.heartbeat_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_format() {
        let msg = TelemetryMessage::new(312.4712, 300.0, Status::Fault);
        let payload = msg.encode().unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"score":312.47,"threshold":300.00,"status":"FAULT"}"#
        );

        let msg = TelemetryMessage::new(7.0, 300.0, Status::Ok);
        assert_eq!(
            msg.encode().unwrap().as_str(),
            r#"{"score":7.00,"threshold":300.00,"status":"OK"}"#
        );
    }

    #[test]
    fn extreme_scores_still_fit() {
        let msg = TelemetryMessage::new(f32::MAX, f32::MAX, Status::Fault);
        let payload = msg.encode().unwrap();
        assert!(payload.len() <= MAX_PAYLOAD_LEN);
        assert!(payload.is_ascii());
    }

    #[test]
    fn fault_edge_publishes_immediately() {
        let mut policy = PublishPolicy::new(10_000);
        assert_eq!(
            policy.decide(FaultTransition::Raised, true, 500),
            Some(Status::Fault)
        );
        assert_eq!(policy.last_publish(), 500);
    }

    #[test]
    fn latched_without_edge_stays_quiet() {
        let mut policy = PublishPolicy::new(10_000);
        policy.decide(FaultTransition::Raised, true, 1_000);
        assert_eq!(policy.decide(FaultTransition::Unchanged, true, 60_000), None);
        assert_eq!(policy.last_publish(), 1_000);
    }

    #[test]
    fn heartbeat_is_strictly_greater() {
        let mut policy = PublishPolicy::new(10_000);
        assert_eq!(policy.decide(FaultTransition::Unchanged, false, 10_000), None);
        assert_eq!(
            policy.decide(FaultTransition::Unchanged, false, 10_001),
            Some(Status::Ok)
        );
        assert_eq!(policy.decide(FaultTransition::Unchanged, false, 15_000), None);
    }

    #[test]
    fn clear_edge_publishes_ok_inside_heartbeat_window() {
        let mut policy = PublishPolicy::new(10_000);
        policy.decide(FaultTransition::Raised, true, 5_000);
        assert_eq!(
            policy.decide(FaultTransition::Cleared, false, 6_000),
            Some(Status::Ok)
        );
        assert_eq!(policy.last_publish(), 6_000);
    }
}
