//! livevoice-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Session-, Anruf- und
//! Tool-Crates gemeinsam nutzen: Identifikatoren und die Fehler-Taxonomie.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{LiveVoiceError, Result};
pub use types::{CallId, CloseReason, CorrelationId, SessionId};
