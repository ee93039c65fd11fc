//! Link manager: connection resilience around a [`Transport`]
//!
//! ## Architecture
//!
//! ```text
//!            request_connect()            retry timer (backoff)
//!                   │                            │
//!                   ▼                            ▼
//!          ┌──────────────────────────────────────────┐
//!          │   Mutex<ConnectionMachine>   (shared)    │
//!          └──────────────────────────────────────────┘
//!                   ▲                            │ Start{attempt}
//!    LinkEvent      │                            ▼
//!   (dispatcher) ───┘                    Transport::connect(events)
//!                   ▲                            │
//!                   └──── ack / fail / lost ─────┘
//! ```
//!
//! Every path that touches link state (the loop's publish, the transport's
//! callbacks, the retry timer, the acknowledgement deadline) goes through the
//! same mutex, so the state machine never sees interleaved transitions.
//! Callbacks are tagged with the attempt that produced them; anything from a
//! superseded attempt is ignored.
//!
//! ## Timers
//!
//! - **Retry**: at most one pending. Arming a new one aborts the old task,
//!   and the retry-generation check in the state machine rejects a timer that
//!   fires after being superseded.
//! - **Acknowledgement deadline**: armed per attempt; if the broker has not
//!   answered by then the attempt counts as failed and a retry is scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use vibeguard_core::{
    constants::{CONNECT_WAIT_MS, RECONNECT_BACKOFF_MS},
    AckOutcome, ConnectDecision, ConnectionMachine, ConnectionState, PublishOutcome, RetryTicket,
    TelemetryMessage, TelemetrySink,
};

use crate::{ConnectionStats, ConnectorError, QoS, Transport};

/// Link policy configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Topic status messages are published to
    pub topic: String,
    /// Protocol delivery guarantee
    pub qos: QoS,
    /// Fixed delay before a reconnect attempt
    pub backoff: Duration,
    /// Deadline for the broker's acknowledgement of one attempt
    pub connect_timeout: Duration,
}

impl LinkConfig {
    /// Defaults for `topic`
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            qos: QoS::AtLeastOnce,
            backoff: Duration::from_millis(RECONNECT_BACKOFF_MS),
            connect_timeout: Duration::from_millis(CONNECT_WAIT_MS),
        }
    }

    /// Set the delivery guarantee
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the reconnect backoff
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the acknowledgement deadline
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Outcome of a connect attempt, reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Broker answered the CONNECT
    ConnectAck {
        /// Attempt the answer belongs to
        attempt: u32,
        /// Session accepted
        accepted: bool,
        /// Broker's return code, for the log
        code: String,
    },
    /// Attempt failed before any answer
    ConnectFailed {
        /// Attempt that failed
        attempt: u32,
        /// Why
        reason: String,
    },
    /// Established session lost
    Disconnected {
        /// Attempt whose session was lost
        attempt: u32,
        /// Why
        reason: String,
    },
}

/// Callback handle given to [`Transport::connect`]
///
/// Cheap to clone; every report is stamped with the attempt it was issued
/// for. Reports sent after the manager is gone are discarded.
#[derive(Debug, Clone)]
pub struct LinkEvents {
    attempt: u32,
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkEvents {
    /// Attempt this handle reports for
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Broker answered
    pub fn connect_ack(&self, accepted: bool, code: impl Into<String>) {
        self.send(LinkEvent::ConnectAck {
            attempt: self.attempt,
            accepted,
            code: code.into(),
        });
    }

    /// Attempt failed before an answer
    pub fn connect_failed(&self, reason: impl Into<String>) {
        self.send(LinkEvent::ConnectFailed {
            attempt: self.attempt,
            reason: reason.into(),
        });
    }

    /// Session lost
    pub fn disconnected(&self, reason: impl Into<String>) {
        self.send(LinkEvent::Disconnected {
            attempt: self.attempt,
            reason: reason.into(),
        });
    }

    fn send(&self, event: LinkEvent) {
        // Closed only when the manager is gone
        let _ = self.tx.send(event);
    }
}

struct Inner<T: Transport> {
    transport: T,
    config: LinkConfig,
    machine: Mutex<ConnectionMachine>,
    stats: Mutex<ConnectionStats>,
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    ack_timer: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    state_tx: watch::Sender<ConnectionState>,
    ever_connected: AtomicBool,
    closed: AtomicBool,
    runtime: Handle,
}

/// Shared, cloneable handle to one telemetry link
///
/// Created inside a tokio runtime; timers and callbacks run on that runtime.
pub struct LinkManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for LinkManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> LinkManager<T> {
    /// Wrap `transport` and start the event dispatcher
    ///
    /// Does not connect; call [`request_connect`](Self::request_connect).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(transport: T, config: LinkConfig) -> Self {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let runtime = Handle::current();

        let inner = Arc::new(Inner {
            transport,
            config,
            machine: Mutex::new(ConnectionMachine::new()),
            stats: Mutex::new(ConnectionStats::default()),
            retry_timer: Mutex::new(None),
            ack_timer: Mutex::new(None),
            dispatcher: Mutex::new(None),
            events_tx,
            state_tx,
            ever_connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            runtime: runtime.clone(),
        });

        let weak = Arc::downgrade(&inner);
        let dispatcher = runtime.spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.on_event(event);
            }
        });
        *lock(&inner.dispatcher) = Some(dispatcher);

        Self { inner }
    }

    /// Ask for a connection; no effect while connecting or connected
    pub fn request_connect(&self) {
        if self.inner.closed.load(Ordering::Relaxed) {
            return;
        }
        let decision = lock(&self.inner.machine).request_connect();
        self.inner.apply(decision);
    }

    /// Wait until the link is up, at most `timeout`
    ///
    /// Returns whether the link is connected.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut state = self.inner.state_tx.subscribe();
        let reached = tokio::time::timeout(
            timeout,
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await;
        matches!(reached, Ok(Ok(_)))
    }

    /// Publish one status message, best effort
    ///
    /// Never blocks. While the link is not connected the message is dropped.
    pub fn publish(&self, message: &TelemetryMessage) -> PublishOutcome {
        self.inner.publish(message)
    }

    /// Current link state
    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.machine).state()
    }

    /// Link is up
    pub fn is_connected(&self) -> bool {
        lock(&self.inner.machine).is_connected()
    }

    /// Snapshot of the link statistics
    pub fn stats(&self) -> ConnectionStats {
        lock(&self.inner.stats).clone()
    }

    /// Link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Stop retrying and close the session
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
        self.inner.cancel_timers();
        if let Err(err) = self.inner.transport.disconnect().await {
            debug!("transport disconnect: {}", err);
        }
        let retry = lock(&self.inner.machine).on_disconnect();
        if retry.is_some() {
            self.inner.state_tx.send_replace(ConnectionState::Disconnected);
        }
        info!("Telemetry link closed");
    }
}

impl<T: Transport> TelemetrySink for LinkManager<T> {
    fn publish(&mut self, message: &TelemetryMessage) -> PublishOutcome {
        self.inner.publish(message)
    }
}

impl<T: Transport> Inner<T> {
    fn apply(self: &Arc<Self>, decision: ConnectDecision) {
        match decision {
            ConnectDecision::Start { attempt } => self.start_attempt(attempt),
            ConnectDecision::InFlight => debug!("connect already in flight"),
            ConnectDecision::Established => debug!("already connected"),
            ConnectDecision::Stale => debug!("stale retry ignored"),
        }
    }

    fn start_attempt(self: &Arc<Self>, attempt: u32) {
        lock(&self.stats).connect_attempts += 1;
        self.state_tx.send_replace(ConnectionState::Connecting);
        info!("Connecting to broker (attempt {})", attempt);

        let weak = Arc::downgrade(self);
        let deadline = self.config.connect_timeout;
        let ack_timer = self.runtime.spawn(async move {
            tokio::time::sleep(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_event(LinkEvent::ConnectFailed {
                    attempt,
                    reason: "no acknowledgement before deadline".into(),
                });
            }
        });
        replace_timer(&self.ack_timer, Some(ack_timer));

        let events = LinkEvents {
            attempt,
            tx: self.events_tx.clone(),
        };
        let weak = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let Some(inner) = weak.upgrade() else { return };
            if let Err(err) = inner.transport.connect(events).await {
                inner.on_event(LinkEvent::ConnectFailed {
                    attempt,
                    reason: err.to_string(),
                });
            }
        });
    }

    fn on_event(self: &Arc<Self>, event: LinkEvent) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }

        let mut machine = lock(&self.machine);
        let current = machine.attempt();

        match event {
            LinkEvent::ConnectAck { attempt, .. }
            | LinkEvent::ConnectFailed { attempt, .. }
            | LinkEvent::Disconnected { attempt, .. }
                if attempt != current =>
            {
                debug!("ignoring report from superseded attempt {}", attempt);
            }
            LinkEvent::ConnectAck { accepted, code, .. } => {
                match machine.on_connect_ack(accepted) {
                    AckOutcome::Connected => {
                        replace_timer(&self.ack_timer, None);
                        if self.ever_connected.swap(true, Ordering::Relaxed) {
                            lock(&self.stats).reconnections += 1;
                        }
                        self.state_tx.send_replace(ConnectionState::Connected);
                        match self.transport.identity() {
                            Some(id) => info!("Broker connection accepted [{}]", id),
                            None => info!("Broker connection accepted"),
                        }
                    }
                    AckOutcome::Rejected(ticket) => {
                        replace_timer(&self.ack_timer, None);
                        let err = ConnectorError::Refused(code);
                        error!("Broker rejected session: {}", err);
                        {
                            let mut stats = lock(&self.stats);
                            stats.rejections += 1;
                            stats.last_error = Some(err.to_string());
                        }
                        self.fall_back(ticket);
                    }
                    AckOutcome::Ignored => debug!("acknowledgement without attempt in flight"),
                }
            }
            LinkEvent::ConnectFailed { reason, .. } => {
                if let Some(ticket) = machine.on_connect_failed() {
                    replace_timer(&self.ack_timer, None);
                    warn!("Connect attempt failed: {}", reason);
                    lock(&self.stats).last_error = Some(reason);
                    self.fall_back(ticket);
                }
            }
            LinkEvent::Disconnected { reason, .. } => {
                if let Some(ticket) = machine.on_disconnect() {
                    replace_timer(&self.ack_timer, None);
                    warn!("Broker connection lost: {}", reason);
                    lock(&self.stats).last_error = Some(reason);
                    self.fall_back(ticket);
                }
            }
        }
    }

    /// Link just dropped to Disconnected: publish the state and arm the retry
    fn fall_back(self: &Arc<Self>, ticket: RetryTicket) {
        self.state_tx.send_replace(ConnectionState::Disconnected);

        let weak: Weak<Self> = Arc::downgrade(self);
        let backoff = self.config.backoff;
        let retry = self.runtime.spawn(async move {
            tokio::time::sleep(backoff).await;
            if let Some(inner) = weak.upgrade() {
                inner.retry_due(ticket);
            }
        });
        replace_timer(&self.retry_timer, Some(retry));
        debug!("reconnect scheduled in {:?}", backoff);
    }

    fn retry_due(self: &Arc<Self>, ticket: RetryTicket) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        let decision = lock(&self.machine).retry_due(ticket);
        if decision.should_start() {
            info!("Reconnecting to broker");
        }
        self.apply(decision);
    }

    fn publish(&self, message: &TelemetryMessage) -> PublishOutcome {
        if !lock(&self.machine).is_connected() {
            lock(&self.stats).messages_dropped += 1;
            debug!("link down, {} status dropped", message.status);
            return PublishOutcome::Dropped;
        }

        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                let mut stats = lock(&self.stats);
                stats.messages_failed += 1;
                stats.last_error = Some(err.to_string());
                warn!("status not encoded: {}", err);
                return PublishOutcome::Failed;
            }
        };

        match self
            .transport
            .publish(&self.config.topic, payload.as_bytes(), self.config.qos)
        {
            Ok(()) => {
                let mut stats = lock(&self.stats);
                stats.messages_sent += 1;
                stats.bytes_sent += payload.len() as u64;
                PublishOutcome::Sent
            }
            Err(err) => {
                let mut stats = lock(&self.stats);
                stats.messages_failed += 1;
                stats.last_error = Some(err.to_string());
                warn!("publish failed: {}", err);
                PublishOutcome::Failed
            }
        }
    }

    fn cancel_timers(&self) {
        replace_timer(&self.retry_timer, None);
        replace_timer(&self.ack_timer, None);
    }
}

impl<T: Transport> Drop for Inner<T> {
    fn drop(&mut self) {
        self.cancel_timers();
        if let Some(dispatcher) = lock(&self.dispatcher).take() {
            dispatcher.abort();
        }
    }
}

/// Store `next` in `slot`, aborting the task it replaces
fn replace_timer(slot: &Mutex<Option<JoinHandle<()>>>, next: Option<JoinHandle<()>>) {
    if let Some(previous) = std::mem::replace(&mut *lock(slot), next) {
        previous.abort();
    }
}

/// Lock, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
