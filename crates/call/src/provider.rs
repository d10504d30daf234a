//! Schnittstelle zum Telefonie-Provider
//!
//! Ein [`CallProvider`] platziert ausgehende Anrufe und liefert spaeter die
//! Details (Status, Aufnahme-URL, Dauer). Live-Mitschnitt und Auflegen sind
//! optional und haben deshalb Standard-Implementierungen.

use async_trait::async_trait;
use livevoice_core::CallId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fehler eines Providers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider hat den Anruf abgelehnt: {0}")]
    Abgelehnt(String),

    #[error("HTTP-Fehler: {0}")]
    Http(String),

    #[error("Unerwartete Antwort: {0}")]
    Antwort(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Stimme und Auftrag des Anruf-Agenten
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    pub name: String,
    /// Stimmen-ID beim Provider
    pub voice: String,
    /// Auftrag bzw. System-Prompt
    pub prompt: String,
    /// Erster Satz nach dem Abheben
    pub first_sentence: String,
}

/// Ein zu platzierender Anruf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Zielrufnummer
    pub destination: String,
    pub persona: Persona,
}

impl CallRequest {
    pub fn new(destination: impl Into<String>, persona: Persona) -> Self {
        Self {
            destination: destination.into(),
            persona,
        }
    }
}

/// Stand eines Anrufs beim Provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub status: Option<String>,
    pub completed: bool,
    /// Fehlt, solange die Aufnahme noch verarbeitet wird
    pub recording_url: Option<String>,
    /// Vom Provider gemeldete Dauer in Sekunden
    pub duration_secs: Option<u64>,
}

/// Ausgehende Anrufe ueber einen externen Dienst
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Platziert den Anruf und liefert die Provider-ID
    async fn place_call(&self, request: &CallRequest) -> ProviderResult<CallId>;

    async fn get_call_details(&self, id: &CallId) -> ProviderResult<CallDetails>;

    /// URL eines Live-Mitschnitts, `None` wenn nicht angeboten
    async fn monitor_url(&self, _id: &CallId) -> ProviderResult<Option<String>> {
        Ok(None)
    }

    /// Beendet den Anruf auf Provider-Seite
    async fn end_call(&self, _id: &CallId) -> ProviderResult<()> {
        Ok(())
    }
}
