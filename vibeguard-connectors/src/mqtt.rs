//! MQTT transport over `rumqttc`
//!
//! Each [`Transport::connect`] builds a fresh client and event loop and polls
//! it on a background task. The poll task translates what the broker does into
//! [`LinkEvents`] and stops at the first error: reconnecting is the link
//! manager's job, with its own backoff, not the event loop's.
//!
//! | Event loop yields                    | Reported as          |
//! |--------------------------------------|----------------------|
//! | `ConnAck` with `Success`             | `connect_ack(true)`  |
//! | `ConnectionRefused(code)`            | `connect_ack(false)` |
//! | error before any `ConnAck`           | `connect_failed`     |
//! | error or `Disconnect` after `ConnAck` | `disconnected`       |

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::debug;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Packet,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use vibeguard_core::constants::CLIENT_ID_CAPACITY;

use crate::{ConnectorError, LinkConfig, LinkEvents, QoS, Transport};

/// Prefix of generated client identifiers
pub const CLIENT_ID_PREFIX: &str = "vibeguard";

/// Time allowed for a graceful DISCONNECT before the poll task is aborted
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// MQTT connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier; generated when absent or empty
    pub client_id: Option<String>,
    /// Broker username
    pub username: Option<String>,
    /// Broker password
    pub password: Option<String>,
    /// Status topic
    pub topic: String,
    /// Delivery guarantee
    pub qos: QoS,
    /// Keep-alive interval (seconds)
    pub keep_alive_secs: u64,
    /// Request channel capacity between client and event loop
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: None,
            username: None,
            password: None,
            topic: "vibeguard/status".into(),
            qos: QoS::AtLeastOnce,
            keep_alive_secs: 60,
            channel_capacity: 10,
        }
    }
}

impl MqttConfig {
    /// Settings for a broker at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the status topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the delivery guarantee
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Check the settings before any connection is attempted
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::ConfigError("broker host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConnectorError::ConfigError("broker port is zero".into()));
        }
        if self.topic.is_empty() || self.topic.contains(['+', '#']) {
            return Err(ConnectorError::ConfigError(
                "topic must be non-empty and free of wildcards".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConnectorError::ConfigError("channel capacity is zero".into()));
        }
        Ok(())
    }
}

impl From<&MqttConfig> for LinkConfig {
    fn from(config: &MqttConfig) -> Self {
        LinkConfig::new(config.topic.clone()).qos(config.qos)
    }
}

/// Client identifier to present to the broker
///
/// A configured id is trimmed and cut to fit the identifier buffer; an empty
/// or missing one is replaced by `vibeguard-XXXXXXXX` with a random suffix.
pub fn resolve_client_id(configured: Option<&str>) -> String {
    let max = CLIENT_ID_CAPACITY - 1;
    match configured.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            let mut end = id.len().min(max);
            while !id.is_char_boundary(end) {
                end -= 1;
            }
            id[..end].to_string()
        }
        None => format!("{}-{:08X}", CLIENT_ID_PREFIX, rand::random::<u32>()),
    }
}

struct Session {
    client: AsyncClient,
    poller: JoinHandle<()>,
}

/// `rumqttc`-backed [`Transport`]
pub struct MqttTransport {
    config: MqttConfig,
    client_id: String,
    session: Mutex<Option<Session>>,
}

impl MqttTransport {
    /// Validate `config` and fix the client identifier for the process lifetime
    pub fn new(config: MqttConfig) -> Result<Self, ConnectorError> {
        config.validate()?;
        let client_id = resolve_client_id(config.client_id.as_deref());
        Ok(Self {
            config,
            client_id,
            session: Mutex::new(None),
        })
    }

    /// Identifier presented to the broker
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Connection settings
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));
        options.set_clean_session(true);
        if let Some(username) = &self.config.username {
            let password = self.config.password.clone().unwrap_or_default();
            options.set_credentials(username.clone(), password);
        }
        options
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl Transport for MqttTransport {
    async fn connect(&self, events: LinkEvents) -> Result<(), ConnectorError> {
        let (client, eventloop) = AsyncClient::new(self.options(), self.config.channel_capacity);
        debug!(
            "MQTT session for [{}] to {}:{} (attempt {})",
            self.client_id,
            self.config.host,
            self.config.port,
            events.attempt()
        );

        let poller = tokio::spawn(poll(eventloop, events));
        if let Some(previous) = self.session().replace(Session { client, poller }) {
            previous.poller.abort();
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), ConnectorError> {
        let session = self.session();
        let session = session.as_ref().ok_or(ConnectorError::NotConnected)?;
        session
            .client
            .try_publish(topic, to_rumqttc(qos), false, payload.to_vec())
            .map_err(|err| match err {
                ClientError::TryRequest(_) => ConnectorError::BufferFull,
                other => ConnectorError::ProtocolError(other.to_string()),
            })
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        let Some(session) = self.session().take() else {
            return Ok(());
        };

        let result = session
            .client
            .try_disconnect()
            .map_err(|err| ConnectorError::ProtocolError(err.to_string()));

        let abort = session.poller.abort_handle();
        if tokio::time::timeout(DISCONNECT_GRACE, session.poller).await.is_err() {
            abort.abort();
        }
        result
    }

    fn identity(&self) -> Option<&str> {
        Some(self.client_id.as_str())
    }
}

/// Drive one session until it ends, reporting to the link manager
async fn poll(mut eventloop: EventLoop, events: LinkEvents) {
    let mut acknowledged = false;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let accepted = ack.code == ConnectReturnCode::Success;
                events.connect_ack(accepted, format!("{:?}", ack.code));
                if !accepted {
                    return;
                }
                acknowledged = true;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                events.disconnected("broker sent DISCONNECT");
                return;
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                events.connect_ack(false, format!("{:?}", code));
                return;
            }
            Err(err) if acknowledged => {
                events.disconnected(err.to_string());
                return;
            }
            Err(err) => {
                events.connect_failed(err.to_string());
                return;
            }
        }
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MqttConfig::new("broker.local", 8883)
            .client_id("press-3")
            .credentials("device", "secret")
            .topic("plant/press-3/status")
            .keep_alive_secs(30);

        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 8883);
        assert_eq!(config.qos, QoS::AtLeastOnce);
        assert_eq!(config.username.as_deref(), Some("device"));
        assert!(config.validate().is_ok());

        let link = LinkConfig::from(&config);
        assert_eq!(link.topic, "plant/press-3/status");
        assert_eq!(link.qos, QoS::AtLeastOnce);
    }

    #[test]
    fn test_config_validation() {
        assert!(MqttConfig::new("", 1883).validate().is_err());
        assert!(MqttConfig::new("h", 0).validate().is_err());
        assert!(MqttConfig::new("h", 1883).topic("a/+/b").validate().is_err());
        assert!(MqttTransport::new(MqttConfig::new("h", 1883).topic("")).is_err());
    }

    #[test]
    fn test_generated_client_id() {
        let id = resolve_client_id(None);
        assert!(id.starts_with("vibeguard-"));
        assert_eq!(id.len(), "vibeguard-".len() + 8);
        assert!(id[10..].chars().all(|c| c.is_ascii_hexdigit()));

        assert!(resolve_client_id(Some("   ")).starts_with("vibeguard-"));
    }

    #[test]
    fn test_transport_reports_client_id() {
        let transport = MqttTransport::new(MqttConfig::default().client_id("press-3")).unwrap();
        assert_eq!(transport.identity(), Some("press-3"));
        assert_eq!(transport.identity(), Some(transport.client_id()));
    }

    #[test]
    fn test_client_id_truncated_to_buffer() {
        let long = "x".repeat(64);
        let id = resolve_client_id(Some(&long));
        assert_eq!(id.len(), CLIENT_ID_CAPACITY - 1);

        // Never split a multi-byte character
        let wide = "é".repeat(20);
        let id = resolve_client_id(Some(&wide));
        assert!(id.len() <= CLIENT_ID_CAPACITY - 1);
        assert_eq!(id.chars().count(), 15);
    }

    #[tokio::test]
    async fn test_publish_without_session() {
        let transport = MqttTransport::new(MqttConfig::default()).unwrap();
        assert_eq!(
            transport.publish("t", b"{}", QoS::AtLeastOnce),
            Err(ConnectorError::NotConnected)
        );
        assert!(transport.disconnect().await.is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: MqttConfig =
            serde_json::from_str(r#"{"host":"10.0.0.5","qos":"at_most_once"}"#).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos, QoS::AtMostOnce);
    }
}
