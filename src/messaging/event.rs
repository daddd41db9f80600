use crate::types::constants::{inbound_events, intent_events, system_events};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of an event name read off the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SocketEvent {
    /// Session-level events (handshake, keepalive)
    System(SystemEvent),
    /// Domain events routed to local consumers
    Inbound(InboundEventKind),
    /// Anything the client does not understand
    Unknown(String),
}

impl SocketEvent {
    pub fn parse(s: &str) -> Self {
        if let Some(sys) = SystemEvent::parse(s) {
            return Self::System(sys);
        }
        match InboundEventKind::parse(s) {
            Some(kind) => Self::Inbound(kind),
            None => Self::Unknown(s.to_string()),
        }
    }
}

/// Session-level events sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    /// Token accepted, connection is live
    Connected,
    /// Token rejected
    AuthError,
    /// Keepalive reply
    Heartbeat,
}

impl SystemEvent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            system_events::CONNECTED => Some(Self::Connected),
            system_events::AUTH_ERROR => Some(Self::AuthError),
            system_events::HEARTBEAT => Some(Self::Heartbeat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => system_events::CONNECTED,
            Self::AuthError => system_events::AUTH_ERROR,
            Self::Heartbeat => system_events::HEARTBEAT,
        }
    }
}

/// Kinds of domain events local consumers can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InboundEventKind {
    NewLike,
    NewComment,
    NewFollow,
    NewMessage,
    NewGroupInvite,
    UserTyping,
}

impl InboundEventKind {
    pub const ALL: [InboundEventKind; 6] = [
        Self::NewLike,
        Self::NewComment,
        Self::NewFollow,
        Self::NewMessage,
        Self::NewGroupInvite,
        Self::UserTyping,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            inbound_events::NEW_LIKE => Some(Self::NewLike),
            inbound_events::NEW_COMMENT => Some(Self::NewComment),
            inbound_events::NEW_FOLLOW => Some(Self::NewFollow),
            inbound_events::NEW_MESSAGE => Some(Self::NewMessage),
            inbound_events::NEW_GROUP_INVITE => Some(Self::NewGroupInvite),
            inbound_events::USER_TYPING => Some(Self::UserTyping),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewLike => inbound_events::NEW_LIKE,
            Self::NewComment => inbound_events::NEW_COMMENT,
            Self::NewFollow => inbound_events::NEW_FOLLOW,
            Self::NewMessage => inbound_events::NEW_MESSAGE,
            Self::NewGroupInvite => inbound_events::NEW_GROUP_INVITE,
            Self::UserTyping => inbound_events::USER_TYPING,
        }
    }
}

impl std::fmt::Display for InboundEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLike {
    pub bridge_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub bridge_id: String,
    pub comment_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFollow {
    pub follower_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroupInvite {
    pub group_id: String,
    pub inviter_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTyping {
    pub room_id: String,
    pub user_id: String,
    #[serde(default = "default_typing")]
    pub is_typing: bool,
}

fn default_typing() -> bool {
    true
}

/// Typed domain event. Payloads carry ids only; consumers fetch content
/// through the HTTP API when they need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum InboundEvent {
    NewLike(NewLike),
    NewComment(NewComment),
    NewFollow(NewFollow),
    NewMessage(NewMessage),
    NewGroupInvite(NewGroupInvite),
    UserTyping(UserTyping),
}

impl InboundEvent {
    /// Decodes the payload of an event whose kind is already known
    pub fn decode(kind: InboundEventKind, payload: &Value) -> serde_json::Result<Self> {
        let payload = payload.clone();
        Ok(match kind {
            InboundEventKind::NewLike => Self::NewLike(serde_json::from_value(payload)?),
            InboundEventKind::NewComment => Self::NewComment(serde_json::from_value(payload)?),
            InboundEventKind::NewFollow => Self::NewFollow(serde_json::from_value(payload)?),
            InboundEventKind::NewMessage => Self::NewMessage(serde_json::from_value(payload)?),
            InboundEventKind::NewGroupInvite => {
                Self::NewGroupInvite(serde_json::from_value(payload)?)
            }
            InboundEventKind::UserTyping => Self::UserTyping(serde_json::from_value(payload)?),
        })
    }

    pub fn kind(&self) -> InboundEventKind {
        match self {
            Self::NewLike(_) => InboundEventKind::NewLike,
            Self::NewComment(_) => InboundEventKind::NewComment,
            Self::NewFollow(_) => InboundEventKind::NewFollow,
            Self::NewMessage(_) => InboundEventKind::NewMessage,
            Self::NewGroupInvite(_) => InboundEventKind::NewGroupInvite,
            Self::UserTyping(_) => InboundEventKind::UserTyping,
        }
    }
}

/// Client-originated signals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntentKind {
    JoinRoom,
    LeaveRoom,
    TypingStart,
    TypingStop,
    /// Custom user-defined intent
    Custom(String),
}

impl IntentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::JoinRoom => intent_events::JOIN_ROOM,
            Self::LeaveRoom => intent_events::LEAVE_ROOM,
            Self::TypingStart => intent_events::TYPING_START,
            Self::TypingStop => intent_events::TYPING_STOP,
            Self::Custom(s) => s,
        }
    }
}

impl From<&str> for IntentKind {
    fn from(s: &str) -> Self {
        match s {
            intent_events::JOIN_ROOM => Self::JoinRoom,
            intent_events::LEAVE_ROOM => Self::LeaveRoom,
            intent_events::TYPING_START => Self::TypingStart,
            intent_events::TYPING_STOP => Self::TypingStop,
            _ => Self::Custom(s.to_string()),
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
