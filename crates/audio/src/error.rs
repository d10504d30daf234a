//! Fehlertypen fuer Capture, Playback und Codec

use livevoice_core::LiveVoiceError;
use thiserror::Error;

/// Alle moeglichen Fehler des Audio-Crates
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Zugriff auf Audio-Geraet verweigert: {0}")]
    ZugriffVerweigert(String),

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Audio-Geraet bereits geschlossen")]
    Geschlossen,
}

impl AudioError {
    /// Bildet einen Fehler beim Oeffnen der Aufnahme auf die Taxonomie ab
    pub fn into_capture_error(self) -> LiveVoiceError {
        LiveVoiceError::CaptureUnavailable(self.to_string())
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
