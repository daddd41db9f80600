//! # Bridges Realtime
//!
//! Client-side realtime session for the Bridges app: one authenticated
//! WebSocket to the backend event channel, with automatic reconnect, room
//! membership that survives reconnects, and typed routing of inbound events
//! to local listeners.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bridges_realtime::{
//!     ConnectionState, InboundEvent, InboundEventKind, RealtimeSession, SessionOptions,
//!     SharedCredentials, Credentials,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Arc::new(SharedCredentials::new(Credentials::authenticated("access-token")));
//!     let session = RealtimeSession::new(SessionOptions::from_env()?, auth)?;
//!
//!     let mut messages = session.subscribe(InboundEventKind::NewMessage);
//!     session.join_room("group:7");
//!     session.connect();
//!
//!     while let Some(InboundEvent::NewMessage(msg)) = messages.recv().await {
//!         println!("message {} in {}", msg.message_id, msg.conversation_id);
//!     }
//!
//!     assert_ne!(session.state(), ConnectionState::AuthRejected);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{
    ConnectionState, Credentials, CredentialsProvider, RealtimeSession, RealtimeSessionBuilder,
    SessionOptions, SharedCredentials,
};
pub use infrastructure::ReconnectConfig;
pub use messaging::{HandlerId, InboundEvent, InboundEventKind, IntentKind, UnreadCounts};
pub use types::{RealtimeError, RealtimeMessage, Result};
pub use websocket::{Transport, TransportConnection, TransportFrame, WebSocketTransport};
