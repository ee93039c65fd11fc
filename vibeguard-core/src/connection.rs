//! Connection Resilience State Machine
//!
//! ## Overview
//!
//! Pure bookkeeping for the telemetry link. The machine decides whether a
//! connect attempt may start and whether a retry must be scheduled; the
//! connector crate performs the I/O and arms the timers. Keeping the rules
//! here lets them be tested without a runtime or a broker.
//!
//! ## States
//!
//! ```text
//!                   request_connect
//!   Disconnected ─────────────────────► Connecting
//!        ▲  ▲                             │    │
//!        │  │   reject / fail / timeout   │    │ accept
//!        │  └─────────── (+retry) ────────┘    ▼
//!        │                                 Connected
//!        └──────── disconnect (+retry) ────────┘
//! ```
//!
//! ## Retry Generations
//!
//! Every transition into `Disconnected` schedules exactly one retry and hands
//! out a [`RetryTicket`] stamped with a fresh generation. Only the ticket of
//! the latest generation is honoured by [`ConnectionMachine::retry_due`]; an
//! older timer that fires late is answered with [`ConnectDecision::Stale`].
//! At most one retry is therefore ever outstanding, and re-arming replaces it.
//!
//! Connect attempts are numbered the same way so acknowledgements from an
//! abandoned attempt can be recognised and ignored.

// Macro for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No session and no attempt in flight
    Disconnected,
    /// One attempt in flight, waiting for the broker's answer
    Connecting,
    /// Session established
    Connected,
}

/// Handle for one scheduled retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTicket {
    generation: u32,
}

impl RetryTicket {
    /// Generation this ticket was issued for
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Answer to a connect request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Start attempt number `attempt`
    Start {
        /// Attempt identifier, echoed back by acknowledgements
        attempt: u32,
    },
    /// An attempt is already in flight; nothing to do
    InFlight,
    /// Already connected; nothing to do
    Established,
    /// Retry ticket was superseded or cancelled; nothing to do
    Stale,
}

impl ConnectDecision {
    /// Whether the caller must start a connect attempt
    pub fn should_start(&self) -> bool {
        matches!(self, ConnectDecision::Start { .. })
    }
}

/// Answer to a broker acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Session established
    Connected,
    /// Broker refused; retry scheduled
    Rejected(RetryTicket),
    /// No attempt in flight; acknowledgement ignored
    Ignored,
}

/// Connection state plus retry and attempt generations
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempt: u32,
    generation: u32,
    pending_retry: Option<u32>,
}

impl ConnectionMachine {
    /// Disconnected, nothing scheduled
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            generation: 0,
            pending_retry: None,
        }
    }

    /// Ask for a connection
    ///
    /// Only `Disconnected` starts an attempt. A direct request supersedes any
    /// pending retry.
    pub fn request_connect(&mut self) -> ConnectDecision {
        match self.state {
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                self.pending_retry = None;
                self.attempt = self.attempt.wrapping_add(1);
                ConnectDecision::Start {
                    attempt: self.attempt,
                }
            }
            ConnectionState::Connecting => ConnectDecision::InFlight,
            ConnectionState::Connected => ConnectDecision::Established,
        }
    }

    /// Broker answered the attempt in flight
    pub fn on_connect_ack(&mut self, accepted: bool) -> AckOutcome {
        if self.state != ConnectionState::Connecting {
            return AckOutcome::Ignored;
        }

        if accepted {
            self.state = ConnectionState::Connected;
            self.pending_retry = None;
            AckOutcome::Connected
        } else {
            AckOutcome::Rejected(self.fall_back())
        }
    }

    /// Attempt failed before any acknowledgement (transport error, timeout)
    pub fn on_connect_failed(&mut self) -> Option<RetryTicket> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        Some(self.fall_back())
    }

    /// Session lost
    ///
    /// Returns `None` if already disconnected: the retry for that transition
    /// was scheduled when it happened.
    pub fn on_disconnect(&mut self) -> Option<RetryTicket> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        Some(self.fall_back())
    }

    /// Retry timer fired
    pub fn retry_due(&mut self, ticket: RetryTicket) -> ConnectDecision {
        if self.pending_retry != Some(ticket.generation) {
            log_debug!("retry generation {} superseded", ticket.generation);
            return ConnectDecision::Stale;
        }
        self.pending_retry = None;
        self.request_connect()
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session established
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Identifier of the latest attempt
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// A retry is scheduled and not yet consumed
    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry.is_some()
    }

    fn fall_back(&mut self) -> RetryTicket {
        self.state = ConnectionState::Disconnected;
        self.generation = self.generation.wrapping_add(1);
        self.pending_retry = Some(self.generation);
        log_debug!(
            "attempt {} ended, retry generation {} armed",
            self.attempt,
            self.generation
        );
        RetryTicket {
            generation: self.generation,
        }
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new()
    }
}
