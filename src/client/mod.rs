// Module declarations
mod builder;
mod connection;
mod credentials;
mod machine;
mod rooms;
mod session;
mod state;

// Public API exports
pub use builder::{
    ENV_CONNECT_TIMEOUT, ENV_HEARTBEAT_INTERVAL, ENV_URL, RealtimeSessionBuilder, SessionOptions,
};
pub use connection::ConnectionManager;
pub use credentials::{Credentials, CredentialsProvider, SharedCredentials};
pub use machine::{ConnectionState, DisconnectCause, SessionAction, SessionMachine};
pub use rooms::RoomMembership;
pub use session::RealtimeSession;
pub use state::ClientState;
