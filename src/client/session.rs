use super::builder::{RealtimeSessionBuilder, SessionOptions};
use super::credentials::CredentialsProvider;
use super::machine::{ConnectionState, DisconnectCause, SessionAction, SessionMachine};
use super::state::ClientState;
use crate::infrastructure::{HeartbeatManager, HeartbeatStatus};
use crate::messaging::{
    EventRouter, HandlerId, InboundEvent, InboundEventKind, IntentKind, SystemEvent, UnreadCounter,
};
use crate::types::{
    AUTH_CLOSE_CODES, RealtimeError, RealtimeMessage, Result, TOKEN_QUERY_PARAM, intent_events,
};
use crate::websocket::{FrameSink, Transport, TransportConnection, TransportFrame};
use futures::stream::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, watch};
use url::Url;

pub(crate) struct SessionInner {
    pub(crate) endpoint: Url,
    pub(crate) options: SessionOptions,
    pub(crate) credentials: Arc<dyn CredentialsProvider>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) router: EventRouter,
    pub(crate) unread: UnreadCounter,
    pub(crate) state: Mutex<ClientState>,
}

/// The client's single live connection to the Bridges event channel.
///
/// `RealtimeSession` authenticates with the current access token, reconnects
/// with capped exponential backoff after network failures (never after a
/// rejected token), re-joins tracked rooms after every reconnect, and routes
/// inbound events to local listeners. Cloning is cheap; all clones share one
/// connection.
///
/// Every public method returns immediately. Failures show up as
/// [`ConnectionState`] transitions and `tracing` records, never as errors.
/// Methods that may open a connection must be called from within a Tokio
/// runtime.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bridges_realtime::{Credentials, InboundEventKind, RealtimeSession, SessionOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = RealtimeSession::new(
///     SessionOptions::new("wss://api.bridges.app/realtime"),
///     Arc::new(Credentials::authenticated("access-token")),
/// )?;
///
/// session.on(InboundEventKind::NewMessage, |event| {
///     println!("new message: {:?}", event);
/// });
/// session.join_room("conversation:42");
/// session.connect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl RealtimeSession {
    /// Creates a session over WebSocket. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::UrlParse`](crate::RealtimeError::UrlParse) or
    /// [`RealtimeError::Config`](crate::RealtimeError::Config) if the options
    /// are invalid.
    pub fn new(options: SessionOptions, credentials: Arc<dyn CredentialsProvider>) -> Result<Self> {
        RealtimeSessionBuilder::new(options).map(|builder| builder.credentials(credentials).build())
    }

    pub fn builder(options: SessionOptions) -> Result<RealtimeSessionBuilder> {
        RealtimeSessionBuilder::new(options)
    }

    /// Opens the connection using the current credentials.
    ///
    /// No-op without a usable access token or when already connected or
    /// connecting. From `Reconnecting` or `AuthRejected` it starts a fresh
    /// attempt with a reset backoff.
    pub fn connect(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::error!("connect() called outside a Tokio runtime; ignoring");
            return;
        }
        let credentials = self.inner.credentials.credentials();
        self.apply(|machine| machine.connect(credentials.usable_token()));
    }

    /// Closes the connection and cancels any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.apply(SessionMachine::disconnect);
    }

    /// Disconnects, removes every listener registered by the host and zeroes
    /// the unread badges (logout). The handle stays usable for the next login.
    pub fn shutdown(&self) {
        self.disconnect();
        self.inner.router.clear();
        self.inner.unread.reset_messages();
        self.inner.unread.reset_notifications();
        self.inner.unread.attach(&self.inner.router);
        tracing::info!("Realtime session shut down");
    }

    /// Subscribes to a room now if connected, otherwise on the next connect
    pub fn join_room(&self, room_id: &str) {
        self.apply(|machine| machine.join_room(room_id));
    }

    /// Unsubscribes from a room
    pub fn leave_room(&self, room_id: &str) {
        self.apply(|machine| machine.leave_room(room_id));
    }

    /// Sends a perishable signal if connected; drops it otherwise.
    ///
    /// Returns whether the intent was queued on the live connection. Room
    /// intents are refused; use [`join_room`](Self::join_room) and
    /// [`leave_room`](Self::leave_room) so they survive reconnects.
    pub fn emit(&self, kind: impl Into<IntentKind>, payload: Value) -> bool {
        let kind = kind.into();
        self.apply(|machine| machine.emit(&kind, payload))
    }

    /// Registers a synchronous listener for one event kind
    pub fn on<F>(&self, kind: InboundEventKind, handler: F) -> HandlerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.inner.router.on(kind, handler)
    }

    /// Removes a listener registered with [`on`](Self::on)
    pub fn off(&self, kind: InboundEventKind, id: HandlerId) -> bool {
        self.inner.router.off(kind, id)
    }

    /// Registers a channel-backed listener for one event kind
    pub fn subscribe(&self, kind: InboundEventKind) -> mpsc::UnboundedReceiver<InboundEvent> {
        self.inner.router.subscribe(kind)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().machine.state()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().machine.is_connected()
    }

    /// Server-assigned id of the live connection
    pub fn connection_id(&self) -> Option<String> {
        self.lock().machine.connection_id().map(str::to_string)
    }

    /// Rooms currently tracked, sorted
    pub fn rooms(&self) -> Vec<String> {
        self.lock().machine.rooms().to_vec()
    }

    /// Watch channel that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.lock().state_change_tx.subscribe()
    }

    /// Unread badges fed by inbound events
    pub fn unread(&self) -> &UnreadCounter {
        &self.inner.unread
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn upgrade(inner: &Weak<SessionInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Runs one machine transition and its actions under the state lock.
    /// Returns whether it produced actions and every frame was queued.
    fn apply<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&mut SessionMachine) -> Vec<SessionAction>,
    {
        let mut guard = self.lock();
        let actions = transition(&mut guard.machine);
        self.execute(&mut guard, actions)
    }

    /// Returns `false` if there was nothing to do or a frame could not be
    /// queued.
    fn execute(&self, state: &mut ClientState, actions: Vec<SessionAction>) -> bool {
        let mut delivered = !actions.is_empty();
        for action in actions {
            match action {
                SessionAction::Open { epoch, token } => {
                    // A firing timer must not be aborted from under itself
                    state.reconnect_timer.take();
                    state.teardown_connection();
                    let url = self.build_endpoint_url(&token);
                    let inner = Arc::downgrade(&self.inner);
                    state.task_manager.spawn(run_connection(inner, epoch, url));
                }
                SessionAction::Close => state.teardown_connection(),
                SessionAction::Send(message) => {
                    if let Err(e) = state.connection.send_message(message) {
                        tracing::debug!("Outbound frame dropped: {}", e);
                        delivered = false;
                    }
                }
                SessionAction::ScheduleReconnect { epoch, delay } => {
                    state.cancel_reconnect_timer();
                    let inner = Arc::downgrade(&self.inner);
                    state.reconnect_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(session) = Self::upgrade(&inner) {
                            session.reconnect_due(epoch);
                        }
                    }));
                }
                SessionAction::CancelReconnect => state.cancel_reconnect_timer(),
            }
        }
        state.notify_state_change();
        delivered
    }

    /// Build the WebSocket endpoint URL carrying the access token
    fn build_endpoint_url(&self, token: &str) -> Url {
        let mut url = self.inner.endpoint.clone();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        url
    }

    fn reconnect_due(&self, epoch: u64) {
        let credentials = self.inner.credentials.credentials();
        self.apply(|machine| machine.on_reconnect_timer(epoch, credentials.usable_token()));
    }

    fn connection_lost(&self, epoch: u64, cause: &DisconnectCause) {
        self.apply(|machine| machine.on_connection_lost(epoch, cause));
    }

    fn auth_rejected(&self, epoch: u64, reason: &str) {
        self.apply(|machine| machine.on_auth_rejected(epoch, reason));
    }

    /// Hands the outbound half of a freshly opened transport to the writer.
    /// Returns `false` if the attempt was superseded meanwhile.
    fn attach_writer(&self, epoch: u64, sink: FrameSink) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.machine.epoch() != epoch {
            return false;
        }
        let inner = Arc::downgrade(&self.inner);
        state
            .connection
            .set_writer(sink, &mut state.task_manager, move |e| {
                if let Some(session) = Self::upgrade(&inner) {
                    session.connection_lost(epoch, &DisconnectCause::Network(e.to_string()));
                }
            });
        true
    }

    fn handle_text(&self, epoch: u64, text: &str) {
        if self.lock().machine.epoch() != epoch {
            return;
        }

        let message = match serde_json::from_str::<RealtimeMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping unparseable frame: {} - Raw: {}", e, text);
                return;
            }
        };
        tracing::debug!(
            "Received '{}' on topic {} (ref {:?})",
            message.event,
            message.topic,
            message.r#ref
        );

        match self.inner.router.route(&message) {
            None => {}
            Some(SystemEvent::Connected) => {
                let connection_id = message
                    .payload
                    .get("connection_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                self.handle_connected(epoch, connection_id);
            }
            Some(SystemEvent::AuthError) => {
                let reason = message
                    .payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("token rejected");
                self.auth_rejected(epoch, reason);
            }
            Some(SystemEvent::Heartbeat) => {
                if let Some(r#ref) = &message.r#ref
                    && self.lock().heartbeat.acknowledge(r#ref)
                {
                    tracing::debug!("Received heartbeat ack for ref {}", r#ref);
                }
            }
        }
    }

    fn handle_connected(&self, epoch: u64, connection_id: Option<String>) {
        let mut guard = self.lock();
        let was_connected = guard.machine.is_connected();
        let actions = guard.machine.on_connected(epoch, connection_id);
        let now_connected = guard.machine.is_connected();

        if !was_connected && now_connected {
            let inner = Arc::downgrade(&self.inner);
            let heartbeat = HeartbeatManager::new().with_interval(self.inner.options.heartbeat_interval());
            guard.task_manager.spawn(async move {
                heartbeat
                    .run(|| match Self::upgrade(&inner) {
                        Some(session) => session.heartbeat_tick(epoch),
                        None => HeartbeatStatus::Stopped,
                    })
                    .await;
            });
        }
        self.execute(&mut guard, actions);
    }

    fn heartbeat_tick(&self, epoch: u64) -> HeartbeatStatus {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.machine.epoch() != epoch || !state.machine.is_connected() {
            return HeartbeatStatus::Stopped;
        }

        if state.heartbeat.is_pending() {
            tracing::warn!("Heartbeat timeout detected, dropping connection");
            let actions = state
                .machine
                .on_connection_lost(epoch, &DisconnectCause::HeartbeatTimeout);
            self.execute(state, actions);
            return HeartbeatStatus::TimedOut;
        }

        let beat = RealtimeMessage::session(intent_events::HEARTBEAT, Value::Object(Default::default()));
        match state.connection.send_message(beat) {
            Ok(r#ref) => {
                state.heartbeat.begin(r#ref);
                HeartbeatStatus::Sent
            }
            Err(e) => {
                tracing::error!("[Heartbeat] Failed to send: {}", e);
                let cause = DisconnectCause::Network(e.to_string());
                let actions = state.machine.on_connection_lost(epoch, &cause);
                self.execute(state, actions);
                HeartbeatStatus::TimedOut
            }
        }
    }
}

/// Drives one transport attempt: handshake, then the read loop. Holds only a
/// weak reference to the session so dropping every handle stops it.
async fn run_connection(inner: Weak<SessionInner>, epoch: u64, url: Url) {
    let Some(session) = RealtimeSession::upgrade(&inner) else {
        return;
    };
    let transport = Arc::clone(&session.inner.transport);
    let connect_timeout = session.inner.options.connect_timeout();
    drop(session);

    tracing::info!("Opening connection to {}", redact(&url));
    let opened = tokio::time::timeout(connect_timeout, transport.open(url.as_str())).await;

    let Some(session) = RealtimeSession::upgrade(&inner) else {
        return;
    };
    let TransportConnection { sink, mut stream } = match opened {
        Ok(Ok(connection)) => connection,
        Ok(Err(e)) if e.is_auth() => {
            session.auth_rejected(epoch, &e.to_string());
            return;
        }
        Ok(Err(e)) => {
            tracing::error!("Connection attempt failed: {}", e);
            session.connection_lost(epoch, &DisconnectCause::Network(e.to_string()));
            return;
        }
        Err(_) => {
            tracing::error!("Handshake timed out after {:?}", connect_timeout);
            let cause = DisconnectCause::Network(RealtimeError::Timeout.to_string());
            session.connection_lost(epoch, &cause);
            return;
        }
    };

    if !session.attach_writer(epoch, sink) {
        tracing::debug!("Discarding superseded connection (epoch {})", epoch);
        return;
    }
    drop(session);

    tracing::info!("Starting read task");
    let cause = loop {
        let frame = stream.next().await;
        let Some(session) = RealtimeSession::upgrade(&inner) else {
            return;
        };
        match frame {
            Some(Ok(TransportFrame::Text(text))) => session.handle_text(epoch, &text),
            Some(Ok(TransportFrame::Close { code, reason })) => {
                if let Some(code) = code
                    && AUTH_CLOSE_CODES.contains(&code)
                {
                    session.auth_rejected(epoch, &reason);
                    return;
                }
                tracing::warn!("Server closed connection: code={:?}, reason='{}'", code, reason);
                break DisconnectCause::ServerClosed { code, reason };
            }
            Some(Err(e)) => {
                tracing::error!("WebSocket read error: {}", e);
                break DisconnectCause::Network(e.to_string());
            }
            None => break DisconnectCause::Network("connection closed".into()),
        }
    };

    if let Some(session) = RealtimeSession::upgrade(&inner) {
        session.connection_lost(epoch, &cause);
    }
    tracing::info!("Read task finished");
}

/// Endpoint without the token, for logs
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
