use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors produced inside the realtime session.
///
/// None of these cross the public [`RealtimeSession`](crate::RealtimeSession)
/// surface: the driver turns them into connection state transitions.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server refused the access token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid session configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Handshake did not complete in time
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

impl RealtimeError {
    /// Whether retrying with the same credentials could ever succeed.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
