//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `LV_LOG_LEVEL`: vollstaendige `EnvFilter`-Direktive, z.B.
//!   `info,livevoice_session=debug`
//! - `LV_LOG_FORMAT`: Format (text/json)
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt as subscriber, EnvFilter};

pub const ENV_LEVEL: &str = "LV_LOG_LEVEL";
pub const ENV_FORMAT: &str = "LV_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Ungueltiger Log-Filter '{filter}': {grund}")]
    Filter { filter: String, grund: String },

    #[error("Ungueltiges Log-Format '{0}' (erwartet: text, json)")]
    Format(String),

    #[error("Logging bereits initialisiert: {0}")]
    BereitsInitialisiert(String),
}

/// Ausgabeformat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Result<Self, LoggingError> {
        match s.trim() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::Format(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter-Direktive, Standard: "info"
    pub level: String,
    pub format: LogFormat,
    /// Farbige Ausgabe (nur Textformat)
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Wendet Umgebungs-Overrides an, `lookup` liefert den Wert einer Variable
    pub fn mit_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LoggingError> {
        if let Some(level) = lookup(ENV_LEVEL).filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = lookup(ENV_FORMAT).filter(|f| !f.trim().is_empty()) {
            self.format = LogFormat::parse(&format)?;
        }
        Ok(self)
    }

    /// Overrides aus der Prozessumgebung
    pub fn aus_umgebung(self) -> Result<Self, LoggingError> {
        self.mit_overrides(|name| std::env::var(name).ok())
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::Filter {
            filter: self.level.clone(),
            grund: e.to_string(),
        })
    }
}

/// Initialisiert das Logging-System.
///
/// Liest `LV_LOG_LEVEL` und `LV_LOG_FORMAT` aus der Umgebung. Ein zweiter
/// Aufruf aendert nichts und liefert [`LoggingError::BereitsInitialisiert`].
pub fn logging_initialisieren(config: &LogConfig) -> Result<(), LoggingError> {
    let config = config.clone().aus_umgebung()?;
    let filter = config.filter()?;

    let ergebnis = match config.format {
        LogFormat::Json => subscriber()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => subscriber()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(config.ansi)
            .try_init(),
    };
    ergebnis.map_err(|e| LoggingError::BereitsInitialisiert(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "Logging initialisiert");
    Ok(())
}
