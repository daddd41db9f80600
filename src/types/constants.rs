/// Server → client session events (magic strings layer)
pub mod system_events {
    pub const CONNECTED: &str = "connected";
    pub const AUTH_ERROR: &str = "auth_error";
    pub const HEARTBEAT: &str = "heartbeat";
}

/// Server → client domain events
pub mod inbound_events {
    pub const NEW_LIKE: &str = "new-like";
    pub const NEW_COMMENT: &str = "new-comment";
    pub const NEW_FOLLOW: &str = "new-follow";
    pub const NEW_MESSAGE: &str = "new-message";
    pub const NEW_GROUP_INVITE: &str = "new-group-invite";
    pub const USER_TYPING: &str = "user-typing";
}

/// Client → server intents
pub mod intent_events {
    pub const JOIN_ROOM: &str = "join_room";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const TYPING_START: &str = "typing_start";
    pub const TYPING_STOP: &str = "typing_stop";
    pub const HEARTBEAT: &str = "heartbeat";
}

/// Topic for session-level traffic (handshake, heartbeats, intents)
pub const SESSION_TOPIC: &str = "session";

/// Query parameter carrying the access token on the connect URL
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Default handshake timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10_000;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 25_000;

/// Reconnect backoff defaults
pub const RECONNECT_BASE_DELAY: u64 = 1_000;
pub const RECONNECT_CAP_DELAY: u64 = 30_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// WebSocket close codes the server uses to reject a token
pub const AUTH_CLOSE_CODES: [u16; 3] = [4001, 4401, 4403];
