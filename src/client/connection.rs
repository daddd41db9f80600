use crate::infrastructure::TaskManager;
use crate::types::{RealtimeError, Result, message::RealtimeMessage};
use crate::websocket::FrameSink;
use futures::SinkExt;
use tokio::sync::mpsc;

/// Outbound side of the live connection.
///
/// Frames are queued on an unbounded channel drained by a writer task, so
/// sending never blocks the caller.
pub struct ConnectionManager {
    outbound: Option<mpsc::UnboundedSender<String>>,
    ref_counter: u64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            outbound: None,
            ref_counter: 0,
        }
    }

    /// Installs a new writer for `sink`, spawning the task that drains it on
    /// `tasks`. Any previous writer is dropped.
    ///
    /// `on_failure` runs once if a write fails; the writer stops afterwards.
    /// Dropping the writer via [`clear_writer`](Self::clear_writer) closes the
    /// sink without calling it.
    pub fn set_writer<F>(&mut self, mut sink: FrameSink, tasks: &mut TaskManager, on_failure: F)
    where
        F: FnOnce(RealtimeError) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        self.outbound = Some(tx);

        tasks.spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = sink.send(text).await {
                    tracing::error!("WebSocket write failed: {}", e);
                    on_failure(e);
                    return;
                }
            }
            if let Err(e) = sink.close().await {
                tracing::debug!("Closing sink failed: {}", e);
            }
        });
    }

    /// Drops the writer; queued frames not yet written are discarded
    pub fn clear_writer(&mut self) {
        self.outbound = None;
    }

    pub fn has_writer(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Generate next message reference
    pub fn make_ref(&mut self) -> String {
        self.ref_counter += 1;
        self.ref_counter.to_string()
    }

    /// Stamps `msg` with a fresh ref and queues it. Returns the ref.
    pub fn send_message(&mut self, msg: RealtimeMessage) -> Result<String> {
        if self.outbound.is_none() {
            return Err(RealtimeError::NotConnected);
        }

        let r#ref = self.make_ref();
        let msg = msg.with_ref(r#ref.clone());
        let json = serde_json::to_string(&msg)?;
        tracing::debug!("Queueing '{}' on topic {} (ref {})", msg.event, msg.topic, r#ref);

        let Some(tx) = &self.outbound else {
            return Err(RealtimeError::NotConnected);
        };
        tx.send(json).map_err(|_| RealtimeError::NotConnected)?;
        Ok(r#ref)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::channel::mpsc as fmpsc;
    use serde_json::json;

    fn sink() -> (FrameSink, fmpsc::UnboundedReceiver<String>) {
        let (tx, rx) = fmpsc::unbounded::<String>();
        let sink = tx.sink_map_err(|e| RealtimeError::Connection(e.to_string()));
        (Box::pin(sink), rx)
    }

    #[test]
    fn test_send_without_writer_fails() {
        let mut connection = ConnectionManager::new();
        let result = connection.send_message(RealtimeMessage::session("heartbeat", json!({})));
        assert!(matches!(result, Err(RealtimeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_writer_forwards_frames_in_order_with_refs() {
        let mut connection = ConnectionManager::new();
        let mut tasks = TaskManager::new();
        let (sink, mut wire) = sink();
        connection.set_writer(sink, &mut tasks, |e| panic!("unexpected write failure: {}", e));
        assert!(connection.has_writer());

        let r1 = connection
            .send_message(RealtimeMessage::session("join_room", json!({"room_id": "g1"})))
            .unwrap();
        let r2 = connection
            .send_message(RealtimeMessage::session("typing_start", json!({"room_id": "g1"})))
            .unwrap();
        assert_eq!((r1.as_str(), r2.as_str()), ("1", "2"));

        let first: RealtimeMessage = serde_json::from_str(&wire.next().await.unwrap()).unwrap();
        let second: RealtimeMessage = serde_json::from_str(&wire.next().await.unwrap()).unwrap();
        assert_eq!(first.event, "join_room");
        assert_eq!(first.r#ref.as_deref(), Some("1"));
        assert_eq!(second.event, "typing_start");

        // Dropping the writer closes the sink
        connection.clear_writer();
        assert!(!connection.has_writer());
        assert_eq!(wire.next().await, None);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_stops_writer() {
        let mut connection = ConnectionManager::new();
        let mut tasks = TaskManager::new();
        let broken = futures::sink::unfold((), |(), _text: String| async {
            Err::<(), _>(RealtimeError::Connection("broken pipe".to_string()))
        });
        let (failed_tx, failed_rx) = tokio::sync::oneshot::channel();
        connection.set_writer(Box::pin(broken), &mut tasks, move |e| {
            let _ = failed_tx.send(e.to_string());
        });

        connection
            .send_message(RealtimeMessage::session("join_room", json!({"room_id": "g1"})))
            .unwrap();
        assert_eq!(failed_rx.await.unwrap(), "Connection error: broken pipe");

        // The writer is gone, so further sends are refused
        tokio::task::yield_now().await;
        assert!(!connection.has_writer());
        let result = connection.send_message(RealtimeMessage::session("typing_start", json!({})));
        assert!(matches!(result, Err(RealtimeError::NotConnected)));
    }
}
