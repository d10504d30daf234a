//! WebSocket-Transport (JSON-Textframes)
//!
//! Jede Nachricht ist ein Textframe mit einer [`ClientMessage`] bzw.
//! [`ServerMessage`] als JSON. Binaerframes sind keine gueltigen
//! Agenten-Nachrichten.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use livevoice_core::LiveVoiceError;
use livevoice_protocol::{decode_server, encode_client, ClientMessage, SessionSetup};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::transport::{AgentLink, AgentTransport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport ueber eine WebSocket-URL
#[derive(Clone)]
pub struct WsTransport {
    url: String,
    api_key: Option<String>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    /// API-Schluessel, wird als `key`-Parameter angehaengt
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(&self) -> String {
        match &self.api_key {
            Some(key) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}key={}", self.url, sep, key)
            }
            None => self.url.clone(),
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl AgentTransport for WsTransport {
    async fn connect(&self, setup: &SessionSetup) -> Result<Box<dyn AgentLink>, LiveVoiceError> {
        let (stream, _antwort) = connect_async(self.endpoint())
            .await
            .map_err(|e| LiveVoiceError::TransportError(format!("{}: {e}", self.url)))?;
        info!(url = %self.url, modell = %setup.model, "Agent-Verbindung aufgebaut");

        let mut link = WsLink { stream };
        link.send(ClientMessage::Setup(setup.clone())).await?;
        Ok(Box::new(link))
    }
}

/// Offene WebSocket-Verbindung
pub struct WsLink {
    stream: WsStream,
}

#[async_trait]
impl AgentLink for WsLink {
    async fn send(&mut self, message: ClientMessage) -> Result<(), LiveVoiceError> {
        let text = encode_client(&message).map_err(|e| LiveVoiceError::Intern(e.to_string()))?;
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| LiveVoiceError::TransportError(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            let Some(frame) = self.stream.next().await else {
                return TransportEvent::Closed(None);
            };
            match frame {
                Ok(Message::Text(text)) => {
                    return match decode_server(text.as_str()) {
                        Ok(msg) => {
                            trace!(art = msg.kind(), "Agent-Nachricht empfangen");
                            TransportEvent::Message(msg)
                        }
                        Err(e) => TransportEvent::Malformed(e.to_string()),
                    };
                }
                Ok(Message::Binary(data)) => {
                    return TransportEvent::Malformed(format!(
                        "Binaerframe ({} Bytes) statt JSON",
                        data.len()
                    ));
                }
                Ok(Message::Close(frame)) => {
                    let grund = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    debug!(?grund, "Agent hat die Verbindung geschlossen");
                    return TransportEvent::Closed(grund);
                }
                // Ping/Pong beantwortet tungstenite selbst
                Ok(_) => continue,
                Err(e) => return TransportEvent::Failed(e.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            warn!("WebSocket-Close fehlgeschlagen: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schluessel_als_parameter() {
        let t = WsTransport::new("wss://agent.example/live").with_api_key("abc");
        assert_eq!(t.endpoint(), "wss://agent.example/live?key=abc");

        let t = WsTransport::new("wss://agent.example/live?alt=json").with_api_key("abc");
        assert_eq!(t.endpoint(), "wss://agent.example/live?alt=json&key=abc");
    }

    #[test]
    fn debug_verbirgt_schluessel() {
        let t = WsTransport::new("wss://x").with_api_key("geheim");
        assert!(!format!("{t:?}").contains("geheim"));
    }

    #[tokio::test]
    async fn verbindungsfehler_ist_transportfehler() {
        let t = WsTransport::new("ws://127.0.0.1:1/live");
        let err = t.connect(&SessionSetup::default()).await.err().unwrap();
        assert!(matches!(err, LiveVoiceError::TransportError(_)));
    }
}
