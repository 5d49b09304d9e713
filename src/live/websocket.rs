// Websocket implementation of the live transport
//
// One socket per session: a setup envelope goes out first, then encoded
// capture frames; a reader task parses inbound envelopes into ServerEvents
// and forwards them in arrival order. The endpoint acknowledges setup with
// setupComplete, which surfaces as ServerEvent::Opened.

use anyhow::{Context, Result};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::messages::{parse_server_message, RealtimeInputMessage, SetupMessage};
use super::transport::{ServerEvent, SessionTransport, TransportConfig, TransportHandle};
use crate::audio::EncodedAudioChunk;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionTransport for WebSocketTransport {
    async fn connect(
        &self,
        config: TransportConfig,
    ) -> Result<(Box<dyn TransportHandle>, mpsc::Receiver<ServerEvent>)> {
        let url = format!("{}?key={}", config.url, config.api_key);

        info!("Connecting to live endpoint at {}", config.url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("Failed to connect to live endpoint")?;

        info!("Websocket connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let setup = SetupMessage::new(&config.model, &config.system_instruction);
        let payload = serde_json::to_string(&setup)?;
        ws_tx
            .send(Message::Text(payload.into()))
            .await
            .context("Failed to send setup message")?;

        let (event_tx, event_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(result) = ws_rx.next().await {
                let message = match result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Websocket error: {}", e);
                        let _ = event_tx
                            .send(ServerEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                };

                let text = match &message {
                    Message::Text(text) => text.as_str().to_string(),
                    // The endpoint also delivers JSON in binary frames
                    Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("Dropping non-UTF8 binary frame");
                            continue;
                        }
                    },
                    Message::Close(frame) => {
                        if let Some(frame) = frame {
                            info!("Websocket closed by server: {} {}", frame.code, frame.reason);
                        } else {
                            info!("Websocket closed by server");
                        }
                        let _ = event_tx.send(ServerEvent::Closed).await;
                        return;
                    }
                    _ => continue,
                };

                match parse_server_message(&text) {
                    Ok(events) => {
                        for event in events {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse server message: {}", e);
                    }
                }
            }

            let _ = event_tx.send(ServerEvent::Closed).await;
        });

        Ok((Box::new(WebSocketHandle::new(ws_tx)), event_rx))
    }
}

pub struct WebSocketHandle {
    sink: WsSink,
    closed: bool,
}

impl WebSocketHandle {
    fn new(sink: WsSink) -> Self {
        Self {
            sink,
            closed: false,
        }
    }
}

#[async_trait::async_trait]
impl TransportHandle for WebSocketHandle {
    async fn send(&mut self, chunk: EncodedAudioChunk) -> Result<()> {
        if self.closed {
            anyhow::bail!("Transport already closed");
        }

        let payload = serde_json::to_string(&RealtimeInputMessage::new(chunk))?;
        self.sink
            .send(Message::Text(payload.into()))
            .await
            .context("Failed to send audio frame")
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        info!("Closing live session");

        if let Err(e) = self.sink.send(Message::Close(None)).await {
            warn!("Failed to send close frame: {}", e);
        }
        let _ = self.sink.close().await;

        Ok(())
    }
}
