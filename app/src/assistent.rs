//! Befehl `assistant`: Sprach-Session mit den Audio-Geraeten

use std::sync::Arc;

use anyhow::{Context, Result};
use livevoice_audio::{CpalInput, CpalOutput};
use livevoice_session::{ChannelObserver, SessionEvent, VoiceAssistant};
use livevoice_tools::{CapabilityRegistry, InMemoryListings, ToolBridge, UpdateFiltersCapability};
use tracing::{debug, info, trace, warn};

use crate::config::AppConfig;

fn bestand(config: &AppConfig) -> Result<InMemoryListings> {
    match &config.listings.datei {
        Some(pfad) => InMemoryListings::from_json_file(pfad)
            .with_context(|| format!("Bestand '{pfad}' nicht ladbar")),
        None => {
            info!("Kein Bestand konfiguriert, Suche laeuft auf leerem Bestand");
            Ok(InMemoryListings::new(Vec::new()))
        }
    }
}

/// Oeffnet eine Session und laeuft bis Ctrl-C oder Sessionende
pub async fn starten(config: &AppConfig) -> Result<()> {
    let filter_capability = Arc::new(UpdateFiltersCapability::new(Arc::new(bestand(config)?)));
    let mut filter = filter_capability.subscribe();

    let registry = Arc::new(CapabilityRegistry::new());
    registry.register(filter_capability)?;
    info!(capabilities = ?registry.names(), "Capabilities registriert");

    let assistant = VoiceAssistant::new(
        Arc::new(config.transport()),
        ToolBridge::new(registry),
        config.session_config(),
    );

    let input = CpalInput::new(config.audio.eingabe.clone());
    let output = CpalOutput::open(config.audio.ausgabe.clone())
        .context("Ausgabegeraet nicht verfuegbar")?;
    let (observer, mut events) = ChannelObserver::new();

    let handle = assistant
        .start(Box::new(input), Box::new(output), Arc::new(observer))
        .await
        .context("Session konnte nicht geoeffnet werden")?;
    info!(session_id = %handle.id(), "Session offen, Beenden mit Ctrl-C");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Ctrl-C empfangen, Session wird beendet");
                break;
            }
            event = events.recv() => match event {
                Some(SessionEvent::Disconnected(reason)) => {
                    info!(?reason, "Session beendet");
                    break;
                }
                Some(event) => ereignis_loggen(event),
                None => break,
            },
            Ok(()) = filter.changed() => {
                let aktuell = filter.borrow_and_update().clone();
                info!(filter = ?aktuell, "Suchfilter aktualisiert");
            }
        }
    }

    let summary = match assistant.stop().await {
        Some(summary) => summary,
        None => handle.closed().await,
    };
    info!(
        session_id = %summary.id,
        gesendet = summary.frames_sent,
        abgespielt = summary.buffers_scheduled,
        tool_aufrufe = summary.tool_calls,
        tool_fehler = summary.tool_failures,
        unterbrechungen = summary.interruptions,
        verletzungen = summary.protocol_violations,
        grund = ?summary.close_reason,
        "Session-Bilanz"
    );
    Ok(())
}

fn ereignis_loggen(event: SessionEvent) {
    match event {
        SessionEvent::UserTranscript(text) => info!(sprecher = "nutzer", "{}", text),
        SessionEvent::AgentTranscript(text) => info!(sprecher = "agent", "{}", text),
        SessionEvent::InputLevel(level) => trace!(level, "Mikrofon-Pegel"),
        SessionEvent::AgentSpeaking(aktiv) => debug!(aktiv, "Agent spricht"),
        SessionEvent::Interrupted => info!("Agent unterbrochen"),
        SessionEvent::ToolResult(result) => {
            info!(name = %result.name, erfolg = result.is_success(), "Tool-Ergebnis")
        }
        SessionEvent::Error(e) => warn!("{}", e),
        SessionEvent::StateChanged { from, to } => debug!(%from, %to, "Session-Zustand"),
        SessionEvent::Connected(params) => debug!(?params, "Verbunden"),
        SessionEvent::Disconnected(_) => {}
    }
}
