use super::event::InboundEventKind;
use super::router::{EventRouter, HandlerId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the unread badges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    pub messages: u64,
    pub notifications: u64,
}

/// Local unread-count consumer fed by the event router.
///
/// `new-message` bumps the message badge; likes, comments, follows and
/// group invites bump the notification badge. Typing indicators are ignored.
#[derive(Debug, Clone, Default)]
pub struct UnreadCounter {
    messages: Arc<AtomicU64>,
    notifications: Arc<AtomicU64>,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers this counter on `router`; returns the handler ids it used
    pub fn attach(&self, router: &EventRouter) -> Vec<(InboundEventKind, HandlerId)> {
        let mut ids = Vec::new();
        for kind in InboundEventKind::ALL {
            let counter = match kind {
                InboundEventKind::NewMessage => Arc::clone(&self.messages),
                InboundEventKind::UserTyping => continue,
                _ => Arc::clone(&self.notifications),
            };
            let id = router.on(kind, move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            ids.push((kind, id));
        }
        ids
    }

    pub fn counts(&self) -> UnreadCounts {
        UnreadCounts {
            messages: self.messages.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }

    pub fn reset_messages(&self) {
        self.messages.store(0, Ordering::Relaxed);
    }

    pub fn reset_notifications(&self) {
        self.notifications.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RealtimeMessage;
    use serde_json::json;

    fn route(router: &EventRouter, event: &str, payload: serde_json::Value) {
        router.route(&RealtimeMessage::session(event, payload));
    }

    #[test]
    fn test_counts_by_badge() {
        let router = EventRouter::new();
        let unread = UnreadCounter::new();
        unread.attach(&router);

        route(
            &router,
            "new-message",
            json!({"conversation_id": "c1", "message_id": "m1", "sender_id": "u1"}),
        );
        route(&router, "new-like", json!({"bridge_id": "b1", "user_id": "u1"}));
        route(&router, "new-follow", json!({"follower_id": "u2"}));
        route(&router, "new-group-invite", json!({"group_id": "g1", "inviter_id": "u3"}));
        route(&router, "user-typing", json!({"room_id": "c1", "user_id": "u1"}));

        assert_eq!(
            unread.counts(),
            UnreadCounts {
                messages: 1,
                notifications: 3
            }
        );
    }

    #[test]
    fn test_malformed_event_does_not_count() {
        let router = EventRouter::new();
        let unread = UnreadCounter::new();
        unread.attach(&router);

        route(&router, "new-comment", json!({"bridge_id": "b1"}));

        assert_eq!(unread.counts(), UnreadCounts::default());
    }

    #[test]
    fn test_reset() {
        let router = EventRouter::new();
        let unread = UnreadCounter::new();
        let ids = unread.attach(&router);
        assert_eq!(ids.len(), 5);

        route(
            &router,
            "new-message",
            json!({"conversation_id": "c1", "message_id": "m1", "sender_id": "u1"}),
        );
        route(&router, "new-like", json!({"bridge_id": "b1", "user_id": "u1"}));

        unread.reset_messages();
        assert_eq!(unread.counts().messages, 0);
        assert_eq!(unread.counts().notifications, 1);

        unread.reset_notifications();
        assert_eq!(unread.counts(), UnreadCounts::default());
    }
}
