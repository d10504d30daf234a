//! Capability-Schnittstelle und Fehlertypen

use async_trait::async_trait;
use livevoice_protocol::FunctionDeclaration;
use serde_json::Value;
use thiserror::Error;

use crate::args::ToolArgs;

/// Fehler einer Capability oder der Registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Capability bereits registriert: {0}")]
    BereitsRegistriert(String),

    #[error("Ungueltige Deklaration: {0}")]
    UngueltigeDeklaration(String),

    #[error("Ungueltige Argumente: {0}")]
    UngueltigeArgumente(String),

    #[error("Abfrage fehlgeschlagen: {0}")]
    Abfrage(String),

    #[error("{0}")]
    Fehlgeschlagen(String),
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Eine lokale Funktion, die der Agent aufrufen kann
///
/// Implementierungen muessen mehrfach und mit ueberlappenden Argumenten
/// aufrufbar sein, Aufrufe koennen nebenlaeufig laufen.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, Beschreibung und Argument-Form fuer das Session-Setup
    fn declaration(&self) -> FunctionDeclaration;

    /// Fuehrt die Capability aus
    ///
    /// `args` enthaelt nur deklarierte Argumente mit passendem Typ.
    async fn invoke(&self, args: ToolArgs) -> CapabilityResult<Value>;
}
