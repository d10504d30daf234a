//! livevoice-app – Bibliotheks-Root
//!
//! Deklariert die Befehle des Binaries und stellt sie fuer Tests bereit.

pub mod anruf;
pub mod assistent;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::AppConfig;
use livevoice_audio::{list_devices, DeviceDirection};

/// Kommandozeile des Binaries
#[derive(Debug, Parser)]
#[command(name = "livevoice", version)]
#[command(about = "LiveVoice - Sprach-Assistent und ausgehende Anrufe", long_about = None)]
pub struct Cli {
    /// Ohne Befehl startet der Assistent
    #[command(subcommand)]
    pub befehl: Option<Befehl>,
}

impl Cli {
    pub fn befehl(&self) -> Befehl {
        self.befehl.clone().unwrap_or(Befehl::Assistent)
    }
}

/// Befehl aus der Kommandozeile
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Befehl {
    /// Sprach-Session mit Mikrofon und Lautsprecher
    #[command(name = "assistant")]
    Assistent,
    /// Ausgehender Anruf an die Nummer
    #[command(name = "call")]
    Anruf {
        #[arg(value_parser = rufnummer)]
        nummer: String,
    },
    /// Audio-Geraete auflisten
    #[command(name = "devices")]
    Geraete,
}

fn rufnummer(wert: &str) -> Result<String, String> {
    let nummer = wert.trim();
    if nummer.is_empty() {
        return Err("Rufnummer darf nicht leer sein".into());
    }
    Ok(nummer.to_string())
}

/// Haelt die Konfiguration und fuehrt Befehle aus
pub struct App {
    pub config: AppConfig,
}

impl App {
    pub fn neu(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn ausfuehren(self, befehl: Befehl) -> Result<()> {
        match befehl {
            Befehl::Assistent => assistent::starten(&self.config).await,
            Befehl::Anruf { nummer } => anruf::starten(&self.config, nummer).await,
            Befehl::Geraete => geraete_auflisten(),
        }
    }
}

fn geraete_auflisten() -> Result<()> {
    for (titel, richtung) in [
        ("Eingabe", DeviceDirection::Input),
        ("Ausgabe", DeviceDirection::Output),
    ] {
        println!("{titel}:");
        for device in list_devices(richtung)? {
            let markierung = if device.is_default { "*" } else { " " };
            let rate = device
                .default_rate
                .map(|r| format!("{r} Hz"))
                .unwrap_or_else(|| "? Hz".into());
            println!(
                "  {markierung} {} ({rate}, {} Kanaele)",
                device.name, device.channels
            );
        }
    }
    Ok(())
}
