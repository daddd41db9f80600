use super::event::{InboundEvent, InboundEventKind, SocketEvent, SystemEvent};
use crate::types::message::RealtimeMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Local consumer callback. Runs synchronously on the connection's reader
/// task, so it should hand off anything slow.
pub type EventHandler = Arc<dyn Fn(&InboundEvent) + Send + Sync + 'static>;

/// Identifies a registered handler for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Clone)]
enum Listener {
    Callback(EventHandler),
    Channel(mpsc::UnboundedSender<InboundEvent>),
}

#[derive(Clone)]
struct Binding {
    id: HandlerId,
    listener: Listener,
}

/// Routes incoming messages to the local consumers registered per event kind.
///
/// The router never touches the network or storage. System events are handed
/// back to the caller; domain events are decoded and fanned out in arrival
/// order; unknown or malformed frames are logged and dropped.
pub struct EventRouter {
    bindings: RwLock<HashMap<InboundEventKind, Vec<Binding>>>,
    next_id: AtomicU64,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback for one event kind
    pub fn on<F>(&self, kind: InboundEventKind, handler: F) -> HandlerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.bind(kind, Listener::Callback(Arc::new(handler)))
    }

    /// Registers a channel-backed listener for one event kind.
    ///
    /// Dropping the receiver unregisters it on the next matching event.
    pub fn subscribe(&self, kind: InboundEventKind) -> mpsc::UnboundedReceiver<InboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.bind(kind, Listener::Channel(tx));
        rx
    }

    /// Removes a handler. Returns `false` if it was not registered for `kind`.
    pub fn off(&self, kind: InboundEventKind, id: HandlerId) -> bool {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = bindings.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|b| b.id != id);
        before != list.len()
    }

    /// Removes every listener
    pub fn clear(&self) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn listener_count(&self, kind: InboundEventKind) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    fn bind(&self, kind: InboundEventKind, listener: Listener) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Binding { id, listener });
        id
    }

    /// Routes one message. Returns the system event it carries, if any, for
    /// the session to act on.
    pub fn route(&self, message: &RealtimeMessage) -> Option<SystemEvent> {
        match SocketEvent::parse(&message.event) {
            SocketEvent::System(sys) => Some(sys),
            SocketEvent::Inbound(kind) => {
                match InboundEvent::decode(kind, &message.payload) {
                    Ok(event) => self.dispatch(&event),
                    Err(e) => {
                        tracing::warn!(
                            "Dropping malformed '{}' event on topic {}: {}",
                            kind,
                            message.topic,
                            e
                        );
                    }
                }
                None
            }
            SocketEvent::Unknown(name) => {
                tracing::warn!(
                    "Dropping unknown event '{}' on topic {}",
                    name,
                    message.topic
                );
                None
            }
        }
    }

    /// Delivers an event to every listener registered for its kind
    pub fn dispatch(&self, event: &InboundEvent) {
        let kind = event.kind();
        // Snapshot so handlers may call on/off without deadlocking
        let listeners = {
            let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
            match bindings.get(&kind) {
                Some(list) => list.clone(),
                None => {
                    tracing::debug!("No listeners for '{}'", kind);
                    return;
                }
            }
        };

        let mut closed = Vec::new();
        for binding in &listeners {
            match &binding.listener {
                Listener::Callback(handler) => handler(event),
                Listener::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        closed.push(binding.id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            tracing::debug!("Pruning {} closed '{}' listener(s)", closed.len(), kind);
            let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(list) = bindings.get_mut(&kind) {
                list.retain(|b| !closed.contains(&b.id));
            }
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
