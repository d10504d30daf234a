//! Session-Nachrichten (WebSocket, JSON)
//!
//! Definiert alle Nachrichten zwischen lokalem Client und Sprach-Agenten.
//!
//! ## Design
//! - Tagged Enums (`type`) fuer typsichere Nachrichtentypen
//! - Audio als base64-PCM mit MIME-Typ, siehe [`crate::payload`]
//! - Tool-Aufrufe tragen eine vom Agenten vergebene Korrelations-ID

use livevoice_core::CorrelationId;
use serde::{Deserialize, Serialize};

use crate::payload::{encode_payload, pcm_mime};
use crate::schema::FunctionDeclaration;

/// Standard-Modell des Agenten
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Standard-Stimme der Sprachsynthese
pub const DEFAULT_VOICE: &str = "Aoede";

/// Abtastrate des Mikrofon-Audios auf der Leitung
pub const WIRE_INPUT_RATE: u32 = 16_000;

/// Abtastrate des Agenten-Audios auf der Leitung
pub const WIRE_OUTPUT_RATE: u32 = 24_000;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Verhandelte Session-Parameter, erste Nachricht nach dem Verbindungsaufbau
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub model: String,
    pub system_instruction: String,
    pub voice_name: String,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    /// Transkription der Nutzer-Sprache anfordern
    #[serde(default)]
    pub input_transcription: bool,
    #[serde(default)]
    pub tools: Vec<FunctionDeclaration>,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_instruction: String::new(),
            voice_name: DEFAULT_VOICE.to_string(),
            input_sample_rate: WIRE_INPUT_RATE,
            output_sample_rate: WIRE_OUTPUT_RATE,
            input_transcription: true,
            tools: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool-Aufrufe
// ---------------------------------------------------------------------------

/// Ein einzelner Capability-Aufruf des Agenten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: CorrelationId,
    pub name: String,
    /// Rohe Argumente, Form wird erst in der Tool-Bridge geprueft
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Antwort auf genau einen [`FunctionCall`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: CorrelationId,
    pub name: String,
    pub response: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Client -> Agent
// ---------------------------------------------------------------------------

/// Nachrichten vom Client an den Agenten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Session-Parameter und Capability-Deklarationen
    Setup(SessionSetup),
    /// Ein kodierter Mikrofon-Chunk
    RealtimeInput { mime_type: String, data: String },
    /// Ergebnisse von Tool-Aufrufen
    ToolResponse { responses: Vec<FunctionResponse> },
}

impl ClientMessage {
    /// Erstellt eine Audio-Nachricht aus PCM16-Bytes
    pub fn audio(pcm: &[u8], rate: u32) -> Self {
        Self::RealtimeInput {
            mime_type: pcm_mime(rate),
            data: encode_payload(pcm),
        }
    }

    /// Erstellt eine Tool-Antwort fuer einen einzelnen Aufruf
    pub fn tool_response(response: FunctionResponse) -> Self {
        Self::ToolResponse {
            responses: vec![response],
        }
    }
}

// ---------------------------------------------------------------------------
// Agent -> Client
// ---------------------------------------------------------------------------

/// Nachrichten vom Agenten an den Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Bestaetigung des Setups, Session ist offen
    SetupComplete,
    /// Ein Audio-Puffer des Agenten
    Audio { mime_type: String, data: String },
    /// Transkription der Nutzer-Sprache
    InputTranscription { text: String },
    /// Transkription der Agenten-Sprache
    OutputTranscription { text: String },
    /// Ein oder mehrere Capability-Aufrufe
    ToolCall { calls: Vec<FunctionCall> },
    /// Der Agent verwirft offene Aufrufe
    ToolCallCancellation { ids: Vec<CorrelationId> },
    /// Barge-in: Nutzer spricht, laufende Wiedergabe abbrechen
    Interrupted,
    /// Der Agent hat seinen Redebeitrag beendet
    TurnComplete,
    /// Der Agent kuendigt das Schliessen der Verbindung an
    GoAway {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl ServerMessage {
    /// Kurzer Name fuer Logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetupComplete => "setup_complete",
            Self::Audio { .. } => "audio",
            Self::InputTranscription { .. } => "input_transcription",
            Self::OutputTranscription { .. } => "output_transcription",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolCallCancellation { .. } => "tool_call_cancellation",
            Self::Interrupted => "interrupted",
            Self::TurnComplete => "turn_complete",
            Self::GoAway { .. } => "go_away",
        }
    }
}
