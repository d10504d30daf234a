//! LiveVoice – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt den Befehl aus.

use anyhow::Result;
use livevoice_app::config::{AppConfig, ENV_CONFIG};
use clap::Parser;
use livevoice_app::{App, Cli};
use livevoice_observability::logging_initialisieren;

#[tokio::main]
async fn main() -> Result<()> {
    let befehl = Cli::parse().befehl();

    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(ENV_CONFIG).unwrap_or_else(|_| "config.toml".into());
    let config = AppConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        ?befehl,
        "LiveVoice wird gestartet"
    );

    App::neu(config).ausfuehren(befehl).await
}
