//! Befehl `call`: ausgehender Anruf ueber den HTTP-Provider

use std::sync::Arc;

use anyhow::{Context, Result};
use livevoice_audio::CpalOutput;
use livevoice_call::{
    CallController, CallEvent, CallOutcome, CallRequest, CallState, ChannelCallObserver,
    HttpCallProvider, RecordingStatus, RingIndicator, SilentRing, ToneRing, WsLevelMonitor,
};
use tracing::{debug, info, trace, warn};

use crate::config::AppConfig;

fn klingel_anzeige(config: &AppConfig) -> Box<dyn RingIndicator> {
    if !config.audio.freizeichen {
        return Box::new(SilentRing::default());
    }
    match CpalOutput::open(config.audio.ausgabe.clone()) {
        Ok(output) => Box::new(ToneRing::new(Box::new(output))),
        Err(e) => {
            warn!("Freizeichen nicht moeglich, klingle stumm: {}", e);
            Box::new(SilentRing::default())
        }
    }
}

/// Platziert den Anruf und laeuft bis Ctrl-C oder Anrufende
pub async fn starten(config: &AppConfig, nummer: String) -> Result<()> {
    let provider = HttpCallProvider::new(config.provider_config())
        .context("Telefonie-Provider nicht konfiguriert")?;
    let (observer, mut events) = ChannelCallObserver::new();

    let handle = CallController::new(Arc::new(provider), config.call_config())
        .with_ring(klingel_anzeige(config))
        .with_monitor(Arc::new(WsLevelMonitor))
        .with_observer(Arc::new(observer))
        .spawn();

    let request = CallRequest::new(nummer, config.persona.clone());
    let id = handle.place(request).await?;
    info!(call_id = %id, "Anruf laeuft, Auflegen mit Ctrl-C");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Ctrl-C empfangen, lege auf");
                handle.hang_up().await;
                break;
            }
            event = events.recv() => match event {
                Some(CallEvent::StateChanged { to: CallState::Ended | CallState::Error, .. }) | None => break,
                Some(CallEvent::StateChanged { from, to }) => debug!(%from, %to, "Anruf-Zustand"),
                Some(CallEvent::Level(level)) => trace!(level, "Live-Pegel"),
                Some(CallEvent::Error(e)) => warn!("{}", e),
                Some(CallEvent::Placed(_) | CallEvent::Recording(_)) => {}
            },
        }
    }

    match handle.settled_recording().await {
        RecordingStatus::Ready(recording) => {
            info!(
                call_id = %recording.call_id,
                url = %recording.url,
                dauer_secs = recording.duration_secs,
                "Aufnahme gefunden"
            );
            let gespeichert = handle.confirm_recording(CallOutcome::default()).await?;
            println!("{}", serde_json::to_string_pretty(&gespeichert)?);
        }
        RecordingStatus::Unavailable => warn!("Keine Aufnahme verfuegbar"),
        RecordingStatus::None | RecordingStatus::Fetching => {
            debug!("Kein Aufnahme-Abruf (Anruf nicht angenommen)")
        }
    }
    Ok(())
}
