//! Session-Kanal: Duplex-Verbindung zum Sprach-Agenten
//!
//! [`SessionChannel::connect`] baut die Verbindung auf, wartet auf die
//! Setup-Bestaetigung und startet erst dann die Aufnahme. Danach gehoert
//! der gesamte Zustand einem Task, der per `select!` auf Befehle,
//! Mikrofon-Chunks, Agenten-Nachrichten und fertige Tool-Aufrufe reagiert.
//!
//! ## Reihenfolge
//!
//! Alle ausgehenden Nachrichten (Audio, Tool-Ergebnisse) sendet nur dieser
//! Task, in der Reihenfolge, in der sie entstehen. Eingehendes Audio wird in
//! Ankunftsreihenfolge geplant.
//!
//! ## Abbau
//!
//! Beim Schliessen wird zuerst die Aufnahme gestoppt (Geraet frei), dann
//! die Wiedergabe verworfen. Erst danach kehrt `disconnect()` zurueck.
//! Laufende Tool-Aufrufe werden abgebrochen, nicht abgewartet, ihre
//! Ergebnisse verfallen.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use livevoice_audio::{
    decode_pcm16, AudioInput, AudioOutput, CaptureConfig, CaptureConstraints, CapturePipeline,
    CapturedChunk, PlaybackScheduler, DEFAULT_CHUNK_SIZE,
};
use livevoice_core::{CloseReason, CorrelationId, LiveVoiceError, SessionId};
use livevoice_protocol::{
    decode_payload, is_pcm, parse_pcm_rate, ClientMessage, FunctionCall, ServerMessage,
    SessionSetup, DEFAULT_MODEL, DEFAULT_VOICE, WIRE_INPUT_RATE, WIRE_OUTPUT_RATE,
};
use livevoice_tools::{ToolBridge, ToolInvocation, ToolResult};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, error, info, trace, warn};

use crate::observer::SessionObserver;
use crate::state::{SessionParams, SessionState, SessionTrigger};
use crate::transport::{AgentLink, AgentTransport, TransportEvent};

/// Takt, in dem beendete Wiedergabe-Puffer eingesammelt werden
const REAP_INTERVAL: Duration = Duration::from_millis(50);

/// Hoechstdauer fuer das Schliessen des Links beim Abbau
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration einer Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: String,
    pub voice: String,
    /// Rate des Mikrofon-Audios auf der Leitung
    pub input_rate: u32,
    /// Erwartete Rate des Agenten-Audios (falls der MIME-Typ keine nennt)
    pub output_rate: u32,
    /// Chunkgroesse in Samples bei Geraeterate
    pub chunk_size: usize,
    /// Frist fuer Verbindung und Setup-Bestaetigung
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    pub input_transcription: bool,
    pub constraints: CaptureConstraints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_instruction: String::new(),
            voice: DEFAULT_VOICE.to_string(),
            input_rate: WIRE_INPUT_RATE,
            output_rate: WIRE_OUTPUT_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(10),
            input_transcription: true,
            constraints: CaptureConstraints::default(),
        }
    }
}

impl SessionConfig {
    fn setup(&self, bridge: &ToolBridge) -> SessionSetup {
        SessionSetup {
            model: self.model.clone(),
            system_instruction: self.system_instruction.clone(),
            voice_name: self.voice.clone(),
            input_sample_rate: self.input_rate,
            output_sample_rate: self.output_rate,
            input_transcription: self.input_transcription,
            tools: bridge.declarations(),
        }
    }

    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            chunk_size: self.chunk_size,
            wire_rate: self.input_rate,
            constraints: self.constraints.clone(),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Zusammenfassung einer beendeten Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    /// Gesendete Mikrofon-Chunks
    pub frames_sent: u64,
    /// Geplante Agenten-Puffer
    pub buffers_scheduled: u64,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub interruptions: u64,
    pub protocol_violations: u64,
    pub close_reason: CloseReason,
}

enum Command {
    SetMuted(bool),
    Disconnect(oneshot::Sender<()>),
}

/// Handle einer offenen Session, beliebig klonbar
///
/// Fallen alle Handles weg, wird die Session lokal geschlossen.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    params: SessionParams,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    summary: watch::Receiver<Option<SessionSummary>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Beobachtet Zustandswechsel
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn params(&self) -> SessionParams {
        self.params
    }

    /// Stummschalten: Chunks werden weiter gemessen, aber nicht gesendet
    pub fn set_muted(&self, muted: bool) {
        let _ = self.commands.send(Command::SetMuted(muted));
    }

    /// Schliesst die Session
    ///
    /// Kehrt zurueck, sobald die Aufnahme gestoppt und die Wiedergabe
    /// verworfen ist. Auf einer bereits beendeten Session ohne Wirkung.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Wartet auf das Ende der Session
    pub async fn closed(&self) -> SessionSummary {
        let mut rx = self.summary.clone();
        let result = rx.wait_for(Option::is_some).await;
        match result {
            Ok(summary) => summary.clone().unwrap_or_else(|| self.lost_summary()),
            Err(_) => self.lost_summary(),
        }
    }

    // Session-Task ist ohne Zusammenfassung verschwunden
    fn lost_summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            frames_sent: 0,
            buffers_scheduled: 0,
            tool_calls: 0,
            tool_failures: 0,
            interruptions: 0,
            protocol_violations: 0,
            close_reason: CloseReason::Failed("Session-Task beendet".into()),
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("params", &self.params)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Aufbau
// ---------------------------------------------------------------------------

/// Einstiegspunkt fuer neue Sessions
pub struct SessionChannel;

impl SessionChannel {
    /// Verbindet, wartet auf die Bestaetigung und startet die Aufnahme
    ///
    /// Fehler: `TransportError` (Verbindung, Frist, Abbruch vor der
    /// Bestaetigung) oder `CaptureUnavailable` (Geraet, Berechtigung). In
    /// beiden Faellen endet die Session im Zustand `Error`.
    pub async fn connect(
        config: SessionConfig,
        transport: Arc<dyn AgentTransport>,
        input: Box<dyn AudioInput>,
        output: Box<dyn AudioOutput>,
        bridge: ToolBridge,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<SessionHandle, LiveVoiceError> {
        let id = SessionId::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let mut fsm = Fsm {
            id,
            state: SessionState::Idle,
            state_tx,
            observer: Arc::clone(&observer),
        };
        fsm.apply(SessionTrigger::Connect);

        let setup = config.setup(&bridge);
        let aufbau = tokio::time::timeout(config.connect_timeout, async {
            let mut link = transport.connect(&setup).await?;
            wait_for_ack(link.as_mut()).await?;
            Ok::<_, LiveVoiceError>(link)
        })
        .await;

        let mut link = match aufbau {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => return Err(fsm.fail_connect(e)),
            Err(_) => {
                return Err(fsm.fail_connect(LiveVoiceError::TransportError(format!(
                    "keine Setup-Bestaetigung nach {:?}",
                    config.connect_timeout
                ))))
            }
        };

        let mut capture = CapturePipeline::new(input, config.capture_config());
        if let Err(e) = capture.start() {
            link.close().await;
            return Err(fsm.fail_connect(e.into_capture_error()));
        }
        let playback = PlaybackScheduler::new(output);

        let params = SessionParams {
            input_rate: config.input_rate,
            output_rate: config.output_rate,
            frame_size: config.chunk_size,
            device_rate: capture.native_rate(),
        };
        fsm.apply(SessionTrigger::Acknowledged);
        observer.on_connect(&params);
        info!(session_id = %id, ?params, "Session offen");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (summary_tx, summary_rx) = watch::channel(None);
        let actor = SessionActor {
            fsm,
            output_rate: config.output_rate,
            link,
            capture,
            playback,
            bridge,
            observer,
            tools: JoinSet::new(),
            task_ids: HashMap::new(),
            pending: HashMap::new(),
            seen: HashSet::new(),
            muted: false,
            agent_speaking: false,
            disconnect_acks: Vec::new(),
            stats: Stats::default(),
        };
        tokio::spawn(actor.run(cmd_rx, summary_tx));

        Ok(SessionHandle {
            id,
            params,
            commands: cmd_tx,
            state: state_rx,
            summary: summary_rx,
        })
    }
}

async fn wait_for_ack(link: &mut dyn AgentLink) -> Result<(), LiveVoiceError> {
    loop {
        match link.recv().await {
            TransportEvent::Message(ServerMessage::SetupComplete) => return Ok(()),
            TransportEvent::Message(other) => {
                debug!(art = other.kind(), "Nachricht vor Setup-Bestaetigung verworfen");
            }
            TransportEvent::Malformed(grund) => {
                warn!("Ungueltige Nachricht vor Setup-Bestaetigung: {}", grund);
            }
            TransportEvent::Closed(grund) => {
                return Err(LiveVoiceError::TransportError(format!(
                    "Agent hat vor der Bestaetigung geschlossen ({})",
                    grund.as_deref().unwrap_or("ohne Grund")
                )))
            }
            TransportEvent::Failed(grund) => return Err(LiveVoiceError::TransportError(grund)),
        }
    }
}

// ---------------------------------------------------------------------------
// Zustandsfuehrung
// ---------------------------------------------------------------------------

struct Fsm {
    id: SessionId,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    observer: Arc<dyn SessionObserver>,
}

impl Fsm {
    fn apply(&mut self, trigger: SessionTrigger) -> bool {
        let Some(next) = self.state.next(trigger) else {
            debug!(session_id = %self.id, state = %self.state, ?trigger, "Ausloeser ohne Wirkung");
            return false;
        };
        let from = std::mem::replace(&mut self.state, next);
        self.state_tx.send_replace(next);
        debug!(session_id = %self.id, %from, to = %next, "Zustandswechsel");
        self.observer.on_state_change(from, next);
        true
    }

    fn fail_connect(&mut self, error: LiveVoiceError) -> LiveVoiceError {
        error!(session_id = %self.id, "Session-Aufbau fehlgeschlagen: {}", error);
        self.apply(SessionTrigger::Failure);
        self.observer.on_error(&error);
        self.observer
            .on_disconnect(&CloseReason::Failed(error.to_string()));
        error
    }
}

// ---------------------------------------------------------------------------
// Session-Task
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Stats {
    frames_sent: u64,
    buffers_scheduled: u64,
    tool_calls: u64,
    tool_failures: u64,
    interruptions: u64,
    protocol_violations: u64,
}

/// Warum die Schleife endet
enum Ende {
    Local,
    Remote(Option<String>),
    Failed(LiveVoiceError),
}

struct SessionActor {
    fsm: Fsm,
    output_rate: u32,
    link: Box<dyn AgentLink>,
    capture: CapturePipeline,
    playback: PlaybackScheduler,
    bridge: ToolBridge,
    observer: Arc<dyn SessionObserver>,
    /// Laufende Tool-Aufrufe
    tools: JoinSet<ToolResult>,
    task_ids: HashMap<tokio::task::Id, (CorrelationId, String)>,
    /// Offene Korrelations-IDs
    pending: HashMap<CorrelationId, AbortHandle>,
    /// Alle IDs dieser Session
    seen: HashSet<CorrelationId>,
    muted: bool,
    agent_speaking: bool,
    disconnect_acks: Vec<oneshot::Sender<()>>,
    stats: Stats,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        summary_tx: watch::Sender<Option<SessionSummary>>,
    ) {
        let mut reap = tokio::time::interval(REAP_INTERVAL);
        reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let ende = loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::SetMuted(muted)) => {
                        if self.muted != muted {
                            info!(session_id = %self.fsm.id, muted, "Stummschaltung geaendert");
                        }
                        self.muted = muted;
                    }
                    Some(Command::Disconnect(ack)) => {
                        self.disconnect_acks.push(ack);
                        break Ende::Local;
                    }
                    None => {
                        debug!(session_id = %self.fsm.id, "Alle Handles verworfen");
                        break Ende::Local;
                    }
                },

                chunk = self.capture.next_chunk() => match chunk {
                    Ok(Some(chunk)) => {
                        if let Err(e) = self.on_chunk(chunk).await {
                            break Ende::Failed(e);
                        }
                    }
                    Ok(None) => {
                        break Ende::Failed(LiveVoiceError::CaptureUnavailable(
                            "Aufnahmegeraet liefert keine Daten mehr".into(),
                        ));
                    }
                    Err(e) => break Ende::Failed(e.into_capture_error()),
                },

                event = self.link.recv() => match event {
                    TransportEvent::Message(msg) => {
                        if let Some(ende) = self.on_message(msg) {
                            break ende;
                        }
                    }
                    TransportEvent::Malformed(grund) => {
                        self.protocol_violation(grund);
                    }
                    TransportEvent::Closed(grund) => break Ende::Remote(grund),
                    TransportEvent::Failed(grund) => {
                        break Ende::Failed(LiveVoiceError::TransportError(grund));
                    }
                },

                Some(joined) = self.tools.join_next_with_id(), if !self.tools.is_empty() => {
                    if let Err(e) = self.on_tool_done(joined).await {
                        break Ende::Failed(e);
                    }
                }

                _ = reap.tick() => self.on_tick(),
            }
        };

        let summary = self.teardown(ende).await;
        summary_tx.send_replace(Some(summary));
    }

    // -----------------------------------------------------------------------
    // Ausgehend
    // -----------------------------------------------------------------------

    async fn on_chunk(&mut self, chunk: CapturedChunk) -> Result<(), LiveVoiceError> {
        self.observer.on_input_level(chunk.level);
        if self.muted {
            return Ok(());
        }
        let Some(pcm) = chunk.frame.to_pcm16() else {
            return Err(LiveVoiceError::intern("Capture lieferte kein PCM16"));
        };
        self.link
            .send(ClientMessage::audio(&pcm, chunk.frame.sample_rate()))
            .await?;
        self.stats.frames_sent += 1;
        trace!(session_id = %self.fsm.id, bytes = pcm.len(), "Audio-Chunk gesendet");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Eingehend
    // -----------------------------------------------------------------------

    fn on_message(&mut self, msg: ServerMessage) -> Option<Ende> {
        match msg {
            ServerMessage::SetupComplete => {
                debug!(session_id = %self.fsm.id, "Wiederholte Setup-Bestaetigung ignoriert");
            }
            ServerMessage::Audio { mime_type, data } => self.on_audio(&mime_type, &data),
            ServerMessage::InputTranscription { text } => self.observer.on_user_transcript(&text),
            ServerMessage::OutputTranscription { text } => {
                self.observer.on_agent_transcript(&text)
            }
            ServerMessage::ToolCall { calls } => {
                for call in calls {
                    self.on_tool_call(call);
                }
            }
            ServerMessage::ToolCallCancellation { ids } => {
                for id in ids {
                    match self.pending.remove(&id) {
                        Some(handle) => {
                            handle.abort();
                            debug!(session_id = %self.fsm.id, correlation_id = %id, "Tool-Aufruf vom Agenten abgebrochen");
                        }
                        None => {
                            debug!(session_id = %self.fsm.id, correlation_id = %id, "Abbruch fuer unbekannte Korrelations-ID");
                        }
                    }
                }
            }
            ServerMessage::Interrupted => {
                let gestoppt = self.playback.interrupt();
                self.stats.interruptions += 1;
                self.capture.set_far_end_active(false);
                info!(session_id = %self.fsm.id, gestoppt, "Barge-in, Wiedergabe verworfen");
                self.observer.on_interrupted();
                self.set_speaking(false);
            }
            ServerMessage::TurnComplete => {
                trace!(session_id = %self.fsm.id, "Agent-Zug beendet");
            }
            ServerMessage::GoAway { reason } => {
                info!(session_id = %self.fsm.id, ?reason, "Agent beendet die Session");
                return Some(Ende::Remote(reason));
            }
        }
        None
    }

    fn on_audio(&mut self, mime_type: &str, data: &str) {
        if !is_pcm(mime_type) {
            self.protocol_violation(format!("unerwartetes Audioformat: {mime_type}"));
            return;
        }
        let bytes = match decode_payload(data) {
            Ok(b) => b,
            Err(e) => {
                self.protocol_violation(e.to_string());
                return;
            }
        };
        let rate = parse_pcm_rate(mime_type).unwrap_or(self.output_rate);
        match self.playback.schedule(decode_pcm16(&bytes), rate) {
            Ok(Some(buffer)) => {
                self.stats.buffers_scheduled += 1;
                trace!(session_id = %self.fsm.id, start = buffer.start, ende = buffer.end, "Agenten-Audio geplant");
                self.set_speaking(true);
            }
            Ok(None) => {}
            Err(e) => warn!(session_id = %self.fsm.id, "Wiedergabe nicht moeglich: {}", e),
        }
    }

    fn on_tool_call(&mut self, call: FunctionCall) {
        if !self.seen.insert(call.id.clone()) {
            self.protocol_violation(format!("doppelte Korrelations-ID {}", call.id));
            return;
        }
        self.stats.tool_calls += 1;
        let invocation = ToolInvocation::from_call(&call);
        debug!(
            session_id = %self.fsm.id,
            correlation_id = %invocation.id,
            capability = %invocation.name,
            "Tool-Aufruf gestartet"
        );

        let bridge = self.bridge.clone();
        let id = invocation.id.clone();
        let name = invocation.name.clone();
        let handle = self
            .tools
            .spawn(async move { bridge.execute(invocation).await });
        self.task_ids.insert(handle.id(), (id.clone(), name));
        self.pending.insert(id, handle);
    }

    async fn on_tool_done(
        &mut self,
        joined: Result<(tokio::task::Id, ToolResult), JoinError>,
    ) -> Result<(), LiveVoiceError> {
        let result = match joined {
            Ok((task_id, result)) => {
                self.task_ids.remove(&task_id);
                result
            }
            Err(e) => {
                let Some((id, name)) = self.task_ids.remove(&e.id()) else {
                    return Ok(());
                };
                if e.is_cancelled() {
                    return Ok(());
                }
                ToolResult::failure(id, name, format!("Tool-Task abgebrochen: {e}"))
            }
        };

        if self.pending.remove(&result.id).is_none() {
            warn!(
                session_id = %self.fsm.id,
                correlation_id = %result.id,
                "Ergebnis fuer erledigte Korrelations-ID verworfen"
            );
            return Ok(());
        }

        if !result.is_success() {
            self.stats.tool_failures += 1;
        }
        self.link
            .send(ClientMessage::tool_response(result.to_response()))
            .await?;
        self.observer.on_tool_result(&result);
        Ok(())
    }

    fn on_tick(&mut self) {
        self.playback.reap();
        self.capture.set_far_end_active(self.playback.is_audible());
        if self.agent_speaking && self.playback.active_count() == 0 {
            self.set_speaking(false);
        }
    }

    fn set_speaking(&mut self, speaking: bool) {
        if self.agent_speaking != speaking {
            self.agent_speaking = speaking;
            self.observer.on_agent_speaking(speaking);
        }
    }

    fn protocol_violation(&mut self, grund: String) {
        self.stats.protocol_violations += 1;
        warn!(session_id = %self.fsm.id, "Protokollverletzung, Nachricht verworfen: {}", grund);
        self.observer
            .on_error(&LiveVoiceError::ProtocolViolation(grund));
    }

    // -----------------------------------------------------------------------
    // Abbau
    // -----------------------------------------------------------------------

    async fn teardown(mut self, ende: Ende) -> SessionSummary {
        let reason = match ende {
            Ende::Local => {
                self.fsm.apply(SessionTrigger::Disconnect);
                CloseReason::Local
            }
            Ende::Remote(grund) => {
                self.fsm.apply(SessionTrigger::RemoteClose);
                CloseReason::Remote(grund)
            }
            Ende::Failed(e) => {
                error!(session_id = %self.fsm.id, "Session abgebrochen: {}", e);
                self.fsm.apply(SessionTrigger::Failure);
                self.observer.on_error(&e);
                CloseReason::Failed(e.to_string())
            }
        };

        self.capture.stop();
        self.playback.shutdown();
        self.set_speaking(false);

        let offen = self.pending.len();
        self.tools.abort_all();
        self.pending.clear();
        if offen > 0 {
            debug!(session_id = %self.fsm.id, offen, "Offene Tool-Aufrufe verworfen");
        }

        for ack in self.disconnect_acks.drain(..) {
            let _ = ack.send(());
        }

        if tokio::time::timeout(CLOSE_TIMEOUT, self.link.close())
            .await
            .is_err()
        {
            warn!(session_id = %self.fsm.id, "Link-Close ueberschritt die Frist");
        }

        self.fsm.apply(SessionTrigger::TeardownComplete);
        info!(session_id = %self.fsm.id, ?reason, "Session beendet");
        self.observer.on_disconnect(&reason);

        SessionSummary {
            id: self.fsm.id,
            frames_sent: self.stats.frames_sent,
            buffers_scheduled: self.stats.buffers_scheduled,
            tool_calls: self.stats.tool_calls,
            tool_failures: self.stats.tool_failures,
            interruptions: self.stats.interruptions,
            protocol_violations: self.stats.protocol_violations,
            close_reason: reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardkonfiguration() {
        let c = SessionConfig::default();
        assert_eq!(c.input_rate, 16_000);
        assert_eq!(c.output_rate, 24_000);
        assert_eq!(c.chunk_size, 4096);
        assert_eq!(c.connect_timeout, Duration::from_secs(10));
        assert!(c.input_transcription);
    }

    #[test]
    fn konfiguration_aus_json() {
        let c: SessionConfig =
            serde_json::from_str(r#"{"voice": "Puck", "connect_timeout": 2.5}"#).unwrap();
        assert_eq!(c.voice, "Puck");
        assert_eq!(c.connect_timeout, Duration::from_millis(2500));
        assert_eq!(c.model, DEFAULT_MODEL);
    }

    #[test]
    fn setup_enthaelt_deklarationen() {
        let registry = Arc::new(livevoice_tools::CapabilityRegistry::new());
        let bridge = ToolBridge::new(registry);
        let mut c = SessionConfig::default();
        c.system_instruction = "Du bist Homie".into();
        let setup = c.setup(&bridge);
        assert_eq!(setup.system_instruction, "Du bist Homie");
        assert_eq!(setup.input_sample_rate, 16_000);
        assert!(setup.tools.is_empty());
    }
}
