//! Transport-Schnittstelle zum Sprach-Agenten
//!
//! Ein [`AgentTransport`] baut Verbindungen auf, ein [`AgentLink`] ist eine
//! offene Verbindung. Der Session-Task ist der einzige Besitzer eines Links
//! und ruft `send` und `recv` nie gleichzeitig auf.

use async_trait::async_trait;
use livevoice_core::LiveVoiceError;
use livevoice_protocol::{ClientMessage, ServerMessage, SessionSetup};

/// Was von der Gegenseite ankommt
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Gueltige Nachricht
    Message(ServerMessage),
    /// Nachricht, die sich nicht dekodieren liess
    Malformed(String),
    /// Gegenseite hat geordnet geschlossen
    Closed(Option<String>),
    /// Verbindung abgebrochen
    Failed(String),
}

/// Eine offene Verbindung zum Agenten
#[async_trait]
pub trait AgentLink: Send {
    /// Sendet eine Nachricht, Fehler sind `TransportError`
    async fn send(&mut self, message: ClientMessage) -> Result<(), LiveVoiceError>;

    /// Wartet auf das naechste Ereignis
    ///
    /// Muss abbruch-sicher sein, der Session-Task nutzt es in `select!`.
    async fn recv(&mut self) -> TransportEvent;

    /// Schliesst die Verbindung, Fehler werden nur geloggt
    async fn close(&mut self);
}

/// Baut Verbindungen zum Agenten auf
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Verbindet und sendet das Setup, wartet nicht auf die Bestaetigung
    async fn connect(&self, setup: &SessionSetup) -> Result<Box<dyn AgentLink>, LiveVoiceError>;
}
