//! Zustandsautomat des Session-Kanals
//!
//! ```text
//! Idle -> Connecting -> Open -> Closing -> Closed
//!             |          |
//!             +----------+--> Error
//! ```
//!
//! Alle Uebergaenge laufen ueber [`SessionState::next`]. Ein Ausloeser, der
//! im aktuellen Zustand keine Bedeutung hat, liefert `None` und aendert
//! nichts.

use serde::{Deserialize, Serialize};

/// Zustand einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Error,
}

/// Ausloeser eines Zustandswechsels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTrigger {
    /// Verbindungsaufbau angefordert
    Connect,
    /// Agent hat das Setup bestaetigt
    Acknowledged,
    /// Lokales Trennen
    Disconnect,
    /// Gegenseite hat geschlossen
    RemoteClose,
    /// Fataler Fehler (Transport, Aufnahmegeraet)
    Failure,
    /// Capture und Playback sind abgebaut
    TeardownComplete,
}

impl SessionState {
    /// Uebergangstabelle
    pub fn next(self, trigger: SessionTrigger) -> Option<SessionState> {
        use SessionState::*;
        use SessionTrigger::*;

        match (self, trigger) {
            (Idle, Connect) => Some(Connecting),

            (Connecting, Acknowledged) => Some(Open),
            (Connecting, Disconnect) => Some(Closing),
            // Schliessen vor der Bestaetigung ist ein gescheiterter Aufbau
            (Connecting, RemoteClose | Failure) => Some(Error),

            (Open, Disconnect | RemoteClose) => Some(Closing),
            (Open, Failure) => Some(Error),

            (Closing, TeardownComplete) => Some(Closed),

            _ => None,
        }
    }

    /// Endzustand, die Session ist vollstaendig abgebaut
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// Die Session belegt Geraete oder Verbindung
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closing)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Ausgehandelte Audio-Parameter einer offenen Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Rate des Mikrofon-Audios auf der Leitung
    pub input_rate: u32,
    /// Erwartete Rate des Agenten-Audios
    pub output_rate: u32,
    /// Chunkgroesse in Samples bei Geraeterate
    pub frame_size: usize,
    /// Native Rate des Aufnahmegeraets
    pub device_rate: u32,
}
