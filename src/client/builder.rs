use super::session::SessionInner;
use super::credentials::{Credentials, CredentialsProvider};
use super::state::ClientState;
use super::RealtimeSession;
use crate::infrastructure::ReconnectConfig;
use crate::messaging::{EventRouter, UnreadCounter};
use crate::types::{DEFAULT_CONNECT_TIMEOUT, HEARTBEAT_INTERVAL, RealtimeError, Result};
use crate::websocket::{Transport, WebSocketTransport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Environment variable holding the realtime endpoint
pub const ENV_URL: &str = "BRIDGES_REALTIME_URL";
/// Environment variable overriding the heartbeat interval (ms)
pub const ENV_HEARTBEAT_INTERVAL: &str = "BRIDGES_HEARTBEAT_INTERVAL_MS";
/// Environment variable overriding the connect timeout (ms)
pub const ENV_CONNECT_TIMEOUT: &str = "BRIDGES_CONNECT_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// `ws://` or `wss://` URL of the event channel
    pub endpoint: String,
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: Option<u64>,
    /// Handshake timeout in milliseconds
    pub connect_timeout: Option<u64>,
    pub reconnect: ReconnectConfig,
}

impl SessionOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            heartbeat_interval: None,
            connect_timeout: None,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Reads options from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint =
            var(ENV_URL).ok_or_else(|| RealtimeError::Config(format!("{} must be set", ENV_URL)))?;

        Ok(Self {
            heartbeat_interval: parse_millis(ENV_HEARTBEAT_INTERVAL, var(ENV_HEARTBEAT_INTERVAL))?,
            connect_timeout: parse_millis(ENV_CONNECT_TIMEOUT, var(ENV_CONNECT_TIMEOUT))?,
            ..Self::new(endpoint)
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
    }
}

fn parse_millis(key: &str, raw: Option<String>) -> Result<Option<u64>> {
    raw.map(|raw| {
        raw.trim()
            .parse()
            .map_err(|e| RealtimeError::Config(format!("{}: {}", key, e)))
    })
    .transpose()
}

/// Builder for RealtimeSession that validates configuration and wires the
/// collaborators together
pub struct RealtimeSessionBuilder {
    endpoint: Url,
    options: SessionOptions,
    credentials: Arc<dyn CredentialsProvider>,
    transport: Arc<dyn Transport>,
}

impl RealtimeSessionBuilder {
    /// Create a new builder
    pub fn new(options: SessionOptions) -> Result<Self> {
        let endpoint = Url::parse(&options.endpoint)?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(RealtimeError::Config(format!(
                "endpoint scheme must be ws or wss, got '{}'",
                endpoint.scheme()
            )));
        }
        if options.heartbeat_interval == Some(0) {
            return Err(RealtimeError::Config(
                "heartbeat interval must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            options,
            credentials: Arc::new(Credentials::anonymous()),
            transport: Arc::new(WebSocketTransport::new()),
        })
    }

    /// Source of access tokens; anonymous by default, which makes `connect()`
    /// a no-op
    pub fn credentials(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = provider;
        self
    }

    /// Replaces the WebSocket transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Build the session. No connection is opened until `connect()`.
    pub fn build(self) -> RealtimeSession {
        let router = EventRouter::new();
        let unread = UnreadCounter::new();
        unread.attach(&router);

        let state = ClientState::new(self.options.reconnect);

        RealtimeSession {
            inner: Arc::new(SessionInner {
                endpoint: self.endpoint,
                options: self.options,
                credentials: self.credentials,
                transport: self.transport,
                router,
                unread,
                state: Mutex::new(state),
            }),
        }
    }
}
