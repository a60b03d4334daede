use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use super::codec::EventParser;
use super::constants::CONNECTION_TIMEOUT;
use super::error::{PushError, PushResult};
use crate::domain::ports::PushEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// One connection attempt's worth of push transport.
#[async_trait]
pub trait PushConnection: Send {
    async fn connect(&mut self, url: &str) -> PushResult<()>;
    async fn disconnect(&mut self);
    /// Waits for the next event this client handles.
    async fn receive(&mut self) -> PushResult<PushEvent>;
    fn is_connected(&self) -> bool;
}

pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketConnection {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn connect(&mut self, url: &str) -> PushResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| PushError::timeout("connection"))?
            .map_err(|e| PushError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("WebSocket connection closed");
    }

    async fn receive(&mut self) -> PushResult<PushEvent> {
        let reader = self.reader.as_mut().ok_or(PushError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => match EventParser::parse_event(&text) {
                    Ok(Some(event)) => return Ok(event),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Skipping malformed push frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(PushError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Binary(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(PushError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(PushError::ConnectionClosed {
                        code: 1006,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_before_connect() {
        let mut conn = WebSocketConnection::new();
        assert!(!conn.is_connected());
        assert!(matches!(conn.receive().await, Err(PushError::NotConnected)));
    }
}
