use crate::types::Result;
use async_trait::async_trait;
use futures::{Sink, Stream};
use std::pin::Pin;

/// Frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// JSON text frame
    Text(String),
    /// Server closed the connection
    Close { code: Option<u16>, reason: String },
}

/// Outbound half: accepts serialized text frames
pub type FrameSink = Pin<Box<dyn Sink<String, Error = crate::types::RealtimeError> + Send>>;

/// Inbound half: yields frames until the connection ends
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<TransportFrame>> + Send>>;

/// An open full-duplex connection
pub struct TransportConnection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens connections to the realtime backend.
///
/// Production uses [`WebSocketTransport`](super::WebSocketTransport); tests
/// plug in an in-memory implementation.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a connection to `url`, completing the transport handshake.
    ///
    /// Returns [`RealtimeError::Auth`](crate::RealtimeError::Auth) when the
    /// server refuses the credentials during the handshake itself.
    async fn open(&self, url: &str) -> Result<TransportConnection>;
}
