//! Wire-Format der Session
//!
//! Jede WebSocket-Text-Nachricht traegt genau eine JSON-Nachricht.
//! Ausgehend wird [`ClientMessage`] serialisiert, eingehend wird
//! [`ServerMessage`] gelesen.
//!
//! Eingehende Frames ueber [`MAX_FRAME_SIZE`] werden ohne Parsen verworfen.
//! Fehler beim Lesen sind Protokollverletzungen: die Session loggt und
//! verwirft den Frame, die Verbindung bleibt offen.

use livevoice_core::LiveVoiceError;
use thiserror::Error;

use crate::agent::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Maximale Frame-Groesse (4 MB, ein Audio-Puffer ist deutlich kleiner)
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Kodieren oder Dekodieren einer Nachricht
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame zu gross: {groesse} Bytes (Maximum: {max} Bytes)")]
    FrameZuGross { groesse: usize, max: usize },

    #[error("Ungueltiger Audio-Payload: {0}")]
    Payload(String),

    #[error("Nicht unterstuetztes Audioformat: {0}")]
    Format(String),
}

impl From<ProtocolError> for LiveVoiceError {
    fn from(e: ProtocolError) -> Self {
        LiveVoiceError::ProtocolViolation(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Kodierung
// ---------------------------------------------------------------------------

/// Serialisiert eine ausgehende Nachricht als Text-Frame
pub fn encode_client(msg: &ClientMessage) -> Result<String, ProtocolError> {
    let json = serde_json::to_string(msg)?;
    if json.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameZuGross {
            groesse: json.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(json)
}

/// Liest eine eingehende Nachricht aus einem Text-Frame
pub fn decode_server(frame: &str) -> Result<ServerMessage, ProtocolError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameZuGross {
            groesse: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(serde_json::from_str(frame)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
