//! Connection state machine for the realtime session.
//!
//! Transitions are named methods that mutate the machine and return the
//! [`SessionAction`]s the driver must carry out (open a transport, queue a
//! frame, arm the reconnect timer...). The machine performs no I/O, so every
//! transition can be exercised directly.
//!
//! ```text
//!                 connect()            connected
//! Disconnected ─────────────> Connecting ─────────> Connected
//!      ^                          │                    │
//!      │ disconnect()             │ lost / failed      │ lost
//!      │ (from any state)         v                    v
//!      └──────────────────── Reconnecting <────────────┘
//!                                 │ timer ─> new attempt
//!                  auth_error     v
//!        (any live attempt) ─> AuthRejected  (no retry)
//! ```
//!
//! Every transport attempt is tagged with an epoch. Ending a connection (loss,
//! rejection, explicit disconnect) bumps the epoch, so late events from a
//! superseded attempt are ignored.

use super::rooms::RoomMembership;
use crate::infrastructure::{ReconnectConfig, ReconnectPolicy};
use crate::messaging::IntentKind;
use crate::types::RealtimeMessage;
use serde_json::{Value, json};
use std::time::Duration;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    AuthRejected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::AuthRejected => "auth_rejected",
        };
        f.write_str(s)
    }
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Open a transport carrying `token`; report its events under `epoch`
    Open { epoch: u64, token: String },
    /// Tear down the current transport and its tasks
    Close,
    /// Queue a frame on the live connection
    Send(RealtimeMessage),
    /// Arm the single reconnect timer, replacing any pending one
    ScheduleReconnect { epoch: u64, delay: Duration },
    /// Disarm the reconnect timer
    CancelReconnect,
}

/// Why a live or pending connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The server closed the session
    ServerClosed { code: Option<u16>, reason: String },
    /// Read error, stream end, handshake failure or timeout
    Network(String),
    /// Keepalive went unanswered
    HeartbeatTimeout,
}

impl std::fmt::Display for DisconnectCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerClosed { code, reason } => {
                write!(f, "server closed connection (code={:?}, reason='{}')", code, reason)
            }
            Self::Network(e) => write!(f, "network failure: {}", e),
            Self::HeartbeatTimeout => f.write_str("heartbeat timeout"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: ConnectionState,
    rooms: RoomMembership,
    policy: ReconnectPolicy,
    epoch: u64,
    connection_id: Option<String>,
    timer_pending: bool,
}

impl SessionMachine {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            rooms: RoomMembership::new(),
            policy: ReconnectPolicy::new(reconnect),
            epoch: 0,
            connection_id: None,
            timer_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn rooms(&self) -> &RoomMembership {
        &self.rooms
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.timer_pending
    }

    /// Starts a connection attempt with the given token snapshot
    pub fn connect(&mut self, token: Option<&str>) -> Vec<SessionAction> {
        let Some(token) = token else {
            tracing::info!("connect() skipped: no access token");
            return vec![];
        };

        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            return vec![];
        }

        let mut actions = Vec::new();
        self.cancel_timer(&mut actions);
        if matches!(
            self.state,
            ConnectionState::Reconnecting | ConnectionState::AuthRejected
        ) {
            // A retry may be mid-handshake
            actions.push(SessionAction::Close);
        }

        self.policy.reset();
        self.state = ConnectionState::Connecting;
        self.epoch += 1;
        tracing::info!("Connecting (epoch {})", self.epoch);
        actions.push(SessionAction::Open {
            epoch: self.epoch,
            token: token.to_string(),
        });
        actions
    }

    /// Explicit teardown. Safe to call in any state.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        if self.state == ConnectionState::Disconnected && !self.timer_pending {
            return vec![];
        }

        let mut actions = Vec::new();
        self.cancel_timer(&mut actions);
        actions.push(SessionAction::Close);

        tracing::info!("Disconnecting (was {})", self.state);
        self.end_connection();
        self.policy.reset();
        self.state = ConnectionState::Disconnected;
        actions
    }

    /// The server accepted the token
    pub fn on_connected(&mut self, epoch: u64, connection_id: Option<String>) -> Vec<SessionAction> {
        if self.is_stale(epoch)
            || !matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Reconnecting
            )
        {
            tracing::debug!("Ignoring connect ack for epoch {} in {}", epoch, self.state);
            return vec![];
        }

        self.state = ConnectionState::Connected;
        self.policy.reset();
        tracing::info!(
            "Connected (connection_id={:?}), re-joining {} room(s)",
            connection_id,
            self.rooms.len()
        );
        self.connection_id = connection_id;

        self.rooms
            .iter()
            .map(|room_id| SessionAction::Send(room_intent(IntentKind::JoinRoom, room_id)))
            .collect()
    }

    /// The server refused the token. Terminal until the next `connect()`.
    pub fn on_auth_rejected(&mut self, epoch: u64, reason: &str) -> Vec<SessionAction> {
        if self.is_stale(epoch) {
            return vec![];
        }

        tracing::warn!("Access token rejected: {}", reason);
        let mut actions = Vec::new();
        self.cancel_timer(&mut actions);
        actions.push(SessionAction::Close);
        self.end_connection();
        self.state = ConnectionState::AuthRejected;
        actions
    }

    /// The connection (or connection attempt) for `epoch` ended for a
    /// non-authentication reason.
    pub fn on_connection_lost(&mut self, epoch: u64, cause: &DisconnectCause) -> Vec<SessionAction> {
        if self.is_stale(epoch)
            || matches!(
                self.state,
                ConnectionState::Disconnected | ConnectionState::AuthRejected
            )
        {
            tracing::debug!("Ignoring connection loss for epoch {}: {}", epoch, cause);
            return vec![];
        }

        tracing::warn!("Connection lost in {}: {}", self.state, cause);
        let mut actions = vec![SessionAction::Close];
        self.end_connection();
        self.state = ConnectionState::Reconnecting;
        self.schedule_reconnect(&mut actions);
        actions
    }

    /// The reconnect timer armed under `epoch` fired; `token` is a fresh
    /// credentials snapshot.
    pub fn on_reconnect_timer(&mut self, epoch: u64, token: Option<&str>) -> Vec<SessionAction> {
        if self.is_stale(epoch) || !self.timer_pending || self.state != ConnectionState::Reconnecting
        {
            return vec![];
        }
        self.timer_pending = false;

        let Some(token) = token else {
            tracing::info!("Reconnect abandoned: credentials no longer available");
            self.policy.reset();
            self.state = ConnectionState::Disconnected;
            return vec![];
        };

        self.epoch += 1;
        tracing::info!(
            "Reconnect attempt {}/{} (epoch {})",
            self.policy.attempt(),
            self.policy.max_attempts(),
            self.epoch
        );
        vec![SessionAction::Open {
            epoch: self.epoch,
            token: token.to_string(),
        }]
    }

    /// Tracks `room_id`; sends a join only if live and not already tracked
    pub fn join_room(&mut self, room_id: &str) -> Vec<SessionAction> {
        if !self.rooms.join(room_id) {
            return vec![];
        }
        if !self.is_connected() {
            tracing::debug!("Deferring join of {} until connected", room_id);
            return vec![];
        }
        vec![SessionAction::Send(room_intent(IntentKind::JoinRoom, room_id))]
    }

    /// Untracks `room_id`; sends a leave only if live and it was tracked
    pub fn leave_room(&mut self, room_id: &str) -> Vec<SessionAction> {
        if !self.rooms.leave(room_id) || !self.is_connected() {
            return vec![];
        }
        vec![SessionAction::Send(room_intent(IntentKind::LeaveRoom, room_id))]
    }

    /// Perishable signal: sent now or never. Room intents are durable and
    /// must go through `join_room`/`leave_room`, so they are refused here.
    pub fn emit(&mut self, kind: &IntentKind, payload: Value) -> Vec<SessionAction> {
        if matches!(kind, IntentKind::JoinRoom | IntentKind::LeaveRoom) {
            tracing::warn!("Refusing to emit '{}'; use join_room/leave_room", kind);
            return vec![];
        }
        if !self.is_connected() {
            tracing::debug!("Discarding '{}' intent while {}", kind, self.state);
            return vec![];
        }
        vec![SessionAction::Send(RealtimeMessage::session(
            kind.as_str(),
            payload,
        ))]
    }

    fn is_stale(&self, epoch: u64) -> bool {
        epoch != self.epoch
    }

    fn end_connection(&mut self) {
        self.epoch += 1;
        self.connection_id = None;
    }

    fn cancel_timer(&mut self, actions: &mut Vec<SessionAction>) {
        if self.timer_pending {
            self.timer_pending = false;
            actions.push(SessionAction::CancelReconnect);
        }
    }

    fn schedule_reconnect(&mut self, actions: &mut Vec<SessionAction>) {
        match self.policy.next_delay() {
            Some(delay) => {
                tracing::info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    self.policy.attempt(),
                    self.policy.max_attempts()
                );
                self.timer_pending = true;
                actions.push(SessionAction::ScheduleReconnect {
                    epoch: self.epoch,
                    delay,
                });
            }
            None => {
                tracing::warn!(
                    "Giving up after {} reconnect attempts; call connect() to retry",
                    self.policy.attempt()
                );
            }
        }
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

fn room_intent(kind: IntentKind, room_id: &str) -> RealtimeMessage {
    RealtimeMessage::session(kind.as_str(), json!({ "room_id": room_id }))
}
