use serde::{Deserialize, Serialize};

use super::constants::SESSION_TOPIC;

/// Wire envelope shared by both directions of the event channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeMessage {
    #[serde(default = "session_topic")]
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#ref: Option<String>,
}

fn session_topic() -> String {
    SESSION_TOPIC.to_string()
}

impl RealtimeMessage {
    pub fn new(topic: String, event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic,
            event: event.into(),
            payload,
            r#ref: None,
        }
    }

    /// Message on the session topic
    pub fn session(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(session_topic(), event, payload)
    }

    pub fn with_ref(mut self, r#ref: String) -> Self {
        self.r#ref = Some(r#ref);
        self
    }
}
