use super::transport::{Transport, TransportConnection, TransportFrame};
use crate::types::{RealtimeError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message, http::StatusCode};

/// [`Transport`] over `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<TransportConnection> {
        tracing::debug!("Opening WebSocket connection");

        let ws_stream = match connect_async(url).await {
            Ok((ws_stream, _response)) => ws_stream,
            Err(tungstenite::Error::Http(response))
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                return Err(RealtimeError::Auth(format!(
                    "handshake rejected with status {}",
                    response.status()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let (write_half, read_half) = ws_stream.split();

        let sink = write_half
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(Message::text(text))))
            .sink_map_err(RealtimeError::from);

        let stream = read_half.filter_map(|msg_result| {
            future::ready(match msg_result {
                Ok(Message::Text(text)) => Some(Ok(TransportFrame::Text(text.as_str().to_owned()))),
                Ok(Message::Close(frame)) => Some(Ok(match frame {
                    Some(close_frame) => TransportFrame::Close {
                        code: Some(u16::from(close_frame.code)),
                        reason: close_frame.reason.as_str().to_owned(),
                    },
                    None => TransportFrame::Close {
                        code: None,
                        reason: String::new(),
                    },
                })),
                Ok(Message::Ping(data)) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                    None
                }
                Ok(Message::Pong(data)) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                    None
                }
                Ok(Message::Binary(data)) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    None
                }
                Ok(Message::Frame(_)) => None,
                Err(e) => Some(Err(e.into())),
            })
        });

        Ok(TransportConnection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
