//! Live-Pegel eines laufenden Anrufs
//!
//! Nur zur Anzeige: der Mitschnitt liefert PCM16-Binaerframes, daraus wird
//! je Frame ein RMS-Pegel. Fehler beim Oeffnen sind fuer den Anruf ohne
//! Folgen.

use async_trait::async_trait;
use futures_util::StreamExt;
use livevoice_audio::{decode_pcm16, rms};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

use crate::provider::ProviderError;

/// Pegelstrom, beendet den Mitschnitt beim Drop
pub struct LevelStream {
    levels: mpsc::UnboundedReceiver<f32>,
    _guard: DropGuard,
}

impl LevelStream {
    /// Erstellt einen Strom aus einem Kanal und dem Token der Quelle
    pub fn new(levels: mpsc::UnboundedReceiver<f32>, cancel: CancellationToken) -> Self {
        Self {
            levels,
            _guard: cancel.drop_guard(),
        }
    }

    /// Naechster Pegel, `None` wenn die Quelle beendet ist
    pub async fn next(&mut self) -> Option<f32> {
        self.levels.recv().await
    }
}

/// Oeffnet Live-Mitschnitte
#[async_trait]
pub trait LevelMonitor: Send + Sync {
    async fn open(&self, url: &str) -> Result<LevelStream, ProviderError>;
}

/// Mitschnitt ueber WebSocket
#[derive(Debug, Default, Clone, Copy)]
pub struct WsLevelMonitor;

#[async_trait]
impl LevelMonitor for WsLevelMonitor {
    async fn open(&self, url: &str) -> Result<LevelStream, ProviderError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| ProviderError::Http(format!("Live-Mitschnitt: {e}")))?;
        debug!("Live-Mitschnitt verbunden");

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    frame = ws.next() => match frame {
                        Some(Ok(Message::Binary(data))) => {
                            let level = rms(&decode_pcm16(&data));
                            trace!(level, "Live-Pegel");
                            if tx.send(level).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("Live-Mitschnitt abgebrochen: {}", e);
                            break;
                        }
                    },
                }
            }
            debug!("Live-Mitschnitt beendet");
        });

        Ok(LevelStream::new(rx, cancel))
    }
}
