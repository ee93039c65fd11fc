//! Property tests for frame integrity, hysteresis and the link state machine

use proptest::prelude::*;
use vibeguard_core::{
    AckOutcome, ConnectDecision, ConnectionMachine, ConnectionState, FaultConfirmation,
    FaultTransition, PublishPolicy, Sample, Status, TelemetryMessage, WindowBuffer,
    constants::MAX_PAYLOAD_LEN,
};

proptest! {
    #[test]
    fn prop_frames_complete_every_n_samples(count in 0usize..400) {
        let mut buffer = WindowBuffer::<7>::new();
        let mut frames = 0usize;

        for i in 0..count {
            if let Some(frame) = buffer.append(Sample::new(i as f32, 0.0, 0.0)) {
                frames += 1;
                // The frame holds exactly the last 7 samples, in order
                let first = frame.sample(0).unwrap().x as usize;
                prop_assert_eq!(first, i + 1 - 7);
                prop_assert_eq!(frame.as_interleaved().len(), 21);
            }
        }

        prop_assert_eq!(frames, count / 7);
        prop_assert_eq!(buffer.len(), count % 7);
    }

    #[test]
    fn prop_one_short_of_required_never_latches(
        required in 1u32..10,
        excess in 0.01f32..1_000.0,
        normal in 0.0f32..300.0,
    ) {
        let mut fault = FaultConfirmation::new(300.0, required);
        for _ in 0..required - 1 {
            prop_assert_eq!(fault.observe(300.0 + excess), FaultTransition::Unchanged);
        }
        prop_assert_eq!(fault.observe(normal), FaultTransition::Unchanged);
        prop_assert!(!fault.is_latched());
        prop_assert_eq!(fault.consecutive(), 0);
    }

    #[test]
    fn prop_latches_exactly_on_required_frame(required in 1u32..10, excess in 0.01f32..1_000.0) {
        let mut fault = FaultConfirmation::new(300.0, required);
        for frame in 1..=required {
            let transition = fault.observe(300.0 + excess);
            if frame == required {
                prop_assert_eq!(transition, FaultTransition::Raised);
            } else {
                prop_assert_eq!(transition, FaultTransition::Unchanged);
            }
        }
        prop_assert_eq!(fault.observe(300.0), FaultTransition::Cleared);
    }

    #[test]
    fn prop_heartbeat_never_while_latched(gap in 0u64..1_000_000) {
        let mut policy = PublishPolicy::new(10_000);
        policy.decide(FaultTransition::Raised, true, 1);
        prop_assert_eq!(policy.decide(FaultTransition::Unchanged, true, 1 + gap), None);
    }

    #[test]
    fn prop_payload_always_fits(score in any::<f32>(), threshold in 0.0f32..10_000.0) {
        let msg = TelemetryMessage::new(score, threshold, Status::Fault);
        let payload = msg.encode().unwrap();
        prop_assert!(payload.len() <= MAX_PAYLOAD_LEN);
        prop_assert!(payload.is_ascii());
    }

    #[test]
    fn prop_at_most_one_retry_outstanding(events in proptest::collection::vec(0u8..4, 0..64)) {
        let mut link = ConnectionMachine::new();
        let mut tickets = Vec::new();

        for event in events {
            match event {
                0 => { link.request_connect(); }
                1 => {
                    if let AckOutcome::Rejected(t) = link.on_connect_ack(false) {
                        tickets.push(t);
                    }
                }
                2 => { link.on_connect_ack(true); }
                _ => {
                    if let Some(t) = link.on_disconnect() {
                        tickets.push(t);
                    }
                }
            }
        }

        // Every ticket but the newest is stale
        let live = tickets.pop();
        for ticket in tickets {
            prop_assert_eq!(link.clone().retry_due(ticket), ConnectDecision::Stale);
        }
        if let Some(ticket) = live {
            let started = link.clone().retry_due(ticket).should_start();
            prop_assert_eq!(started, link.has_pending_retry());
            if started {
                prop_assert_eq!(link.state(), ConnectionState::Disconnected);
            }
        }
    }
}
