//! Fehlertypen fuer livevoice
//!
//! Zentrale Fehler-Taxonomie fuer Sessions und Anrufe. Die Untercrates
//! definieren eigene Fehler (Audio, Protokoll, Provider) und bilden sie
//! an ihren Grenzen auf diesen Enum ab.
//!
//! ## Weitergabe
//!
//! - Fatal: `CaptureUnavailable`, `TransportError`, `CallPlacementFailure`
//!   beenden die laufende Session bzw. den laufenden Anruf.
//! - Lokal behoben: `ProtocolViolation`, `ToolExecutionFailure` werden
//!   geloggt bzw. als ToolResult gemeldet, die Session bleibt offen.
//! - Degradiert: `RecordingUnavailable` ist kein Fehlschlag des Anrufs.

use thiserror::Error;

/// Globaler Result-Alias fuer livevoice
pub type Result<T> = std::result::Result<T, LiveVoiceError>;

/// Alle Fehlerzustaende von Session, Tool-Bridge und Anruf-Steuerung
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveVoiceError {
    // --- Audio ---
    #[error("Audio-Eingabe nicht verfuegbar: {0}")]
    CaptureUnavailable(String),

    // --- Verbindung & Protokoll ---
    #[error("Transportfehler: {0}")]
    TransportError(String),

    #[error("Protokollverletzung: {0}")]
    ProtocolViolation(String),

    // --- Tools ---
    #[error("Capability '{capability}' fehlgeschlagen: {grund}")]
    ToolExecutionFailure { capability: String, grund: String },

    // --- Anruf ---
    #[error("Anruf konnte nicht platziert werden: {0}")]
    CallPlacementFailure(String),

    #[error("Aufnahme nicht verfuegbar: {0}")]
    RecordingUnavailable(String),

    // --- Lebenszyklus ---
    #[error("Es ist bereits eine Session aktiv")]
    SessionAlreadyActive,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl LiveVoiceError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die laufende Session bzw. den
    /// laufenden Anruf beendet
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CaptureUnavailable(_)
                | Self::TransportError(_)
                | Self::CallPlacementFailure(_)
                | Self::Intern(_)
        )
    }

    /// Gibt true zurueck wenn der Fehler nur ein degradiertes Ergebnis
    /// bedeutet (kein Fehlschlag)
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::RecordingUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = LiveVoiceError::CaptureUnavailable("Zugriff verweigert".into());
        assert_eq!(
            e.to_string(),
            "Audio-Eingabe nicht verfuegbar: Zugriff verweigert"
        );
    }

    #[test]
    fn fatal_erkennung() {
        assert!(LiveVoiceError::TransportError("x".into()).is_fatal());
        assert!(LiveVoiceError::CallPlacementFailure("x".into()).is_fatal());
        assert!(!LiveVoiceError::ProtocolViolation("x".into()).is_fatal());
        assert!(!LiveVoiceError::ToolExecutionFailure {
            capability: "a".into(),
            grund: "b".into()
        }
        .is_fatal());
    }

    #[test]
    fn aufnahme_fehlt_ist_nur_degradiert() {
        let e = LiveVoiceError::RecordingUnavailable("3 Versuche".into());
        assert!(e.is_degraded());
        assert!(!e.is_fatal());
    }

    #[test]
    fn tool_fehler_enthaelt_capability() {
        let e = LiveVoiceError::ToolExecutionFailure {
            capability: "updateSearchFilters".into(),
            grund: "Suche nicht erreichbar".into(),
        };
        assert!(e.to_string().contains("updateSearchFilters"));
        assert!(e.to_string().contains("Suche nicht erreichbar"));
    }
}
