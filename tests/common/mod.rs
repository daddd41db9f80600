#![allow(dead_code)]

//! In-memory transport standing in for the realtime backend

use async_trait::async_trait;
use bridges_realtime::{
    ConnectionState, RealtimeError, RealtimeMessage, Result, Transport, TransportConnection,
    TransportFrame,
};
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How the next handshake ends
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    /// Accepts, but every write fails while reads keep working
    AcceptBrokenWrites,
    RejectAuth,
    Fail,
    /// Handshake never completes
    Hang,
}

pub struct MockTransport {
    script: Mutex<VecDeque<Outcome>>,
    opened: Mutex<Vec<String>>,
    accepted: mpsc::UnboundedSender<ServerConn>,
}

/// Server side of one accepted connection
pub struct ServerConn {
    to_client: fmpsc::UnboundedSender<Result<TransportFrame>>,
    from_client: fmpsc::UnboundedReceiver<String>,
}

impl MockTransport {
    /// Handshakes follow `script`, then accept
    pub fn new(script: &[Outcome]) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<ServerConn>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let transport = Self {
            script: Mutex::new(script.iter().copied().collect()),
            opened: Mutex::new(Vec::new()),
            accepted,
        };
        (std::sync::Arc::new(transport), rx)
    }

    /// URLs of every open attempt so far
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, url: &str) -> Result<TransportConnection> {
        self.opened.lock().unwrap().push(url.to_string());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);

        match outcome {
            Outcome::Accept => {
                let (client_tx, from_client) = fmpsc::unbounded::<String>();
                let (to_client, client_rx) = fmpsc::unbounded::<Result<TransportFrame>>();
                let _ = self.accepted.send(ServerConn {
                    to_client,
                    from_client,
                });
                Ok(TransportConnection {
                    sink: Box::pin(
                        client_tx.sink_map_err(|e| RealtimeError::Connection(e.to_string())),
                    ),
                    stream: Box::pin(client_rx),
                })
            }
            Outcome::AcceptBrokenWrites => {
                // Server can still talk; nothing the client writes arrives
                let (_, from_client) = fmpsc::unbounded::<String>();
                let (to_client, client_rx) = fmpsc::unbounded::<Result<TransportFrame>>();
                let _ = self.accepted.send(ServerConn {
                    to_client,
                    from_client,
                });
                let broken = futures::sink::unfold((), |(), _text: String| async {
                    Err::<(), _>(RealtimeError::Connection("broken pipe".to_string()))
                });
                Ok(TransportConnection {
                    sink: Box::pin(broken),
                    stream: Box::pin(client_rx),
                })
            }
            Outcome::Hang => futures::future::pending().await,
            Outcome::RejectAuth => Err(RealtimeError::Auth("HTTP 401".to_string())),
            Outcome::Fail => Err(RealtimeError::Connection("connection refused".to_string())),
        }
    }
}

impl ServerConn {
    pub fn send_raw(&self, text: &str) {
        let _ = self
            .to_client
            .unbounded_send(Ok(TransportFrame::Text(text.to_string())));
    }

    pub fn send_event(&self, event: &str, payload: Value) {
        let message = RealtimeMessage::session(event, payload);
        self.send_raw(&serde_json::to_string(&message).unwrap());
    }

    /// Acknowledges the handshake
    pub fn accept_session(&self, connection_id: &str) {
        self.send_event("connected", json!({ "connection_id": connection_id }));
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.unbounded_send(Ok(TransportFrame::Close {
            code: Some(code),
            reason: reason.to_string(),
        }));
    }

    /// Next frame written by the client, or `None` once it hung up
    pub async fn next_frame(&mut self) -> Option<RealtimeMessage> {
        let text = self.from_client.next().await?;
        Some(serde_json::from_str(&text).unwrap())
    }

    pub async fn expect_frame(&mut self) -> RealtimeMessage {
        tokio::time::timeout(Duration::from_secs(120), self.next_frame())
            .await
            .expect("no frame from client")
            .expect("client hung up")
    }

    pub async fn reply(&mut self, message: RealtimeMessage) {
        let text = serde_json::to_string(&message).unwrap();
        self.to_client
            .send(Ok(TransportFrame::Text(text)))
            .await
            .unwrap();
    }
}

pub async fn next_conn(accepted: &mut mpsc::UnboundedReceiver<ServerConn>) -> ServerConn {
    tokio::time::timeout(Duration::from_secs(120), accepted.recv())
        .await
        .expect("client never opened a connection")
        .expect("transport dropped")
}

pub async fn expect_state(states: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(120), states.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("never reached {}", want))
        .expect("session dropped");
}
