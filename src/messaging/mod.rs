// Messaging module - Typed events, routing and local consumers
pub mod event;
pub mod router;
pub mod unread;

pub use event::{InboundEvent, InboundEventKind, IntentKind, SocketEvent, SystemEvent};
pub use router::{EventHandler, EventRouter, HandlerId};
pub use unread::{UnreadCounter, UnreadCounts};
