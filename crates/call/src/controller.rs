//! Lebenszyklus eines ausgehenden Anrufs
//!
//! Ein Task besitzt Zustand, Klingel-Anzeige, Mitschnitt und Aufnahme-Abruf
//! und reagiert per `select!` auf Befehle des [`CallHandle`], auf die
//! Platzierung beim Provider, das Klingelfenster und den Abruf.
//!
//! ## Abheben
//!
//! Viele Provider melden das Abheben nicht. Mit
//! [`AnswerPolicy::RingTimeout`] gilt der Anruf nach dem Klingelfenster als
//! angenommen, mit [`AnswerPolicy::ProviderSignal`] erst nach
//! [`CallHandle::answered`] (optional mit Ersatzfrist).
//!
//! ## Aufnahme
//!
//! Nur beim Verlassen von `Active` wird die Aufnahme abgerufen. Verwerfen
//! bricht einen laufenden Abruf ab.
//!
//! ## Anrufende beim Provider
//!
//! Solange der Anruf `Active` ist, fragt der Task im Abstand von
//! [`CallConfig::status_poll`] den Status beim Provider ab. Meldet der
//! Provider den Anruf als abgeschlossen, endet er mit
//! [`CallTrigger::RemoteEnded`]. Endet der Live-Mitschnitt, wird sofort
//! nachgefragt.

use std::sync::Arc;
use std::time::Duration;

use livevoice_core::{CallId, LiveVoiceError};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::monitor::{LevelMonitor, LevelStream};
use crate::provider::{CallDetails, CallProvider, CallRequest, ProviderError, ProviderResult};
use crate::record::{CallOutcome, CallRecord, PendingRecording, SavedRecording};
use crate::retrieval::{retrieve_recording, RetrievalError, RetrievalPolicy, RetrievalRequest};
use crate::ring::{RingIndicator, SilentRing};
use crate::state::{CallState, CallTrigger};

/// Frist fuer den Aufbau des Live-Mitschnitts
const MONITOR_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Wann ein klingelnder Anruf als angenommen gilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "art", rename_all = "snake_case")]
pub enum AnswerPolicy {
    /// Nach festem Klingelfenster
    RingTimeout(Duration),
    /// Auf Signal des Providers, optional mit Ersatzfrist
    ProviderSignal { fallback: Option<Duration> },
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self::RingTimeout(Duration::from_secs(9))
    }
}

impl AnswerPolicy {
    fn deadline(&self, from: Instant) -> Option<Instant> {
        match self {
            Self::RingTimeout(d) => Some(from + *d),
            Self::ProviderSignal { fallback } => fallback.map(|d| from + d),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    pub answer: AnswerPolicy,
    /// Verweildauer in `Ended`/`Error` vor der Rueckkehr nach `Idle`
    pub reset_after: Duration,
    pub retrieval: RetrievalPolicy,
    /// Abstand der Statusabfrage waehrend `Active`, `None` = nur Signale
    pub status_poll: Option<Duration>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            answer: AnswerPolicy::default(),
            reset_after: Duration::from_secs(2),
            retrieval: RetrievalPolicy::default(),
            status_poll: Some(Duration::from_secs(5)),
        }
    }
}

// ---------------------------------------------------------------------------
// Beobachter
// ---------------------------------------------------------------------------

/// Callbacks eines Anrufs, alle mit leerer Standard-Implementierung
pub trait CallObserver: Send + Sync {
    fn on_state_change(&self, _from: CallState, _to: CallState) {}

    fn on_placed(&self, _id: &CallId) {}

    /// Live-Pegel des Mitschnitts
    fn on_level(&self, _level: f32) {}

    fn on_error(&self, _error: &LiveVoiceError) {}

    fn on_recording(&self, _recording: &PendingRecording) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallObserver;

impl CallObserver for NoopCallObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    StateChanged { from: CallState, to: CallState },
    Placed(CallId),
    Level(f32),
    Error(LiveVoiceError),
    Recording(PendingRecording),
}

/// Leitet alle Callbacks als [`CallEvent`] in einen Kanal
#[derive(Debug, Clone)]
pub struct ChannelCallObserver {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl ChannelCallObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CallObserver for ChannelCallObserver {
    fn on_state_change(&self, from: CallState, to: CallState) {
        let _ = self.tx.send(CallEvent::StateChanged { from, to });
    }

    fn on_placed(&self, id: &CallId) {
        let _ = self.tx.send(CallEvent::Placed(id.clone()));
    }

    fn on_level(&self, level: f32) {
        let _ = self.tx.send(CallEvent::Level(level));
    }

    fn on_error(&self, error: &LiveVoiceError) {
        let _ = self.tx.send(CallEvent::Error(error.clone()));
    }

    fn on_recording(&self, recording: &PendingRecording) {
        let _ = self.tx.send(CallEvent::Recording(recording.clone()));
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Stand der Aufnahme des letzten Anrufs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecordingStatus {
    #[default]
    None,
    /// Abruf laeuft
    Fetching,
    Ready(PendingRecording),
    /// Abruf erschoepft, der Anruf selbst gilt nicht als fehlgeschlagen
    Unavailable,
}

enum Command {
    Place(CallRequest, oneshot::Sender<Result<CallId, LiveVoiceError>>),
    HangUp(oneshot::Sender<()>),
    Answered,
    RemoteEnded,
    Confirm(CallOutcome, oneshot::Sender<Result<SavedRecording, LiveVoiceError>>),
    Discard,
}

/// Handle des Anruf-Tasks, beliebig klonbar
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<CallState>,
    recording: watch::Receiver<RecordingStatus>,
    record: watch::Receiver<Option<CallRecord>>,
}

fn beendet() -> LiveVoiceError {
    LiveVoiceError::intern("Anruf-Steuerung beendet")
}

impl CallHandle {
    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CallState> {
        self.state.clone()
    }

    /// Platziert einen Anruf, liefert die Provider-ID
    ///
    /// Der Zustand ist waehrenddessen bereits `Ringing`.
    pub async fn place(&self, request: CallRequest) -> Result<CallId, LiveVoiceError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Place(request, tx))
            .map_err(|_| beendet())?;
        rx.await.map_err(|_| beendet())?
    }

    /// Legt auf, kehrt zurueck sobald das Klingeln gestoppt ist
    pub async fn hang_up(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::HangUp(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Provider meldet: abgehoben
    pub fn answered(&self) {
        let _ = self.commands.send(Command::Answered);
    }

    /// Provider meldet: Anruf beendet
    pub fn remote_ended(&self) {
        let _ = self.commands.send(Command::RemoteEnded);
    }

    /// Datensatz des aktuellen oder letzten Anrufs
    pub fn record(&self) -> Option<CallRecord> {
        self.record.borrow().clone()
    }

    pub fn recording(&self) -> RecordingStatus {
        self.recording.borrow().clone()
    }

    /// Wartet, bis kein Abruf mehr laeuft
    pub async fn settled_recording(&self) -> RecordingStatus {
        let mut rx = self.recording.clone();
        let result = rx.wait_for(|s| *s != RecordingStatus::Fetching).await;
        match result {
            Ok(status) => status.clone(),
            Err(_) => RecordingStatus::None,
        }
    }

    /// Speichert die gefundene Aufnahme mit Ergebnis
    pub async fn confirm_recording(
        &self,
        outcome: CallOutcome,
    ) -> Result<SavedRecording, LiveVoiceError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Confirm(outcome, tx))
            .map_err(|_| beendet())?;
        rx.await.map_err(|_| beendet())?
    }

    /// Verwirft Aufnahme und laufenden Abruf
    pub fn discard_recording(&self) {
        let _ = self.commands.send(Command::Discard);
    }
}

// ---------------------------------------------------------------------------
// Aufbau
// ---------------------------------------------------------------------------

/// Baut den Anruf-Task zusammen
pub struct CallController {
    provider: Arc<dyn CallProvider>,
    config: CallConfig,
    ring: Box<dyn RingIndicator>,
    monitor: Option<Arc<dyn LevelMonitor>>,
    observer: Arc<dyn CallObserver>,
}

impl CallController {
    pub fn new(provider: Arc<dyn CallProvider>, config: CallConfig) -> Self {
        Self {
            provider,
            config,
            ring: Box::new(SilentRing::default()),
            monitor: None,
            observer: Arc::new(NoopCallObserver),
        }
    }

    pub fn with_ring(mut self, ring: Box<dyn RingIndicator>) -> Self {
        self.ring = ring;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn LevelMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Startet den Task, er endet wenn alle Handles verworfen sind
    pub fn spawn(self) -> CallHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CallState::Idle);
        let (recording_tx, recording_rx) = watch::channel(RecordingStatus::None);
        let (record_tx, record_rx) = watch::channel(None);

        let actor = CallActor {
            provider: self.provider,
            config: self.config,
            ring: self.ring,
            monitor: self.monitor,
            observer: self.observer,
            state: CallState::Idle,
            state_tx,
            recording_tx,
            record_tx,
            record: None,
            destination: String::new(),
            placing: None,
            place_reply: None,
            ring_deadline: None,
            reset_deadline: None,
            status_deadline: None,
            status_check: None,
            opening: None,
            levels: None,
            retrieval: None,
            pending: None,
        };
        tokio::spawn(actor.run(cmd_rx));

        CallHandle {
            commands: cmd_tx,
            state: state_rx,
            recording: recording_rx,
            record: record_rx,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

struct Retrieval {
    cancel: CancellationToken,
    task: JoinHandle<Result<PendingRecording, RetrievalError>>,
}

struct CallActor {
    provider: Arc<dyn CallProvider>,
    config: CallConfig,
    ring: Box<dyn RingIndicator>,
    monitor: Option<Arc<dyn LevelMonitor>>,
    observer: Arc<dyn CallObserver>,

    state: CallState,
    state_tx: watch::Sender<CallState>,
    recording_tx: watch::Sender<RecordingStatus>,
    record_tx: watch::Sender<Option<CallRecord>>,

    record: Option<CallRecord>,
    destination: String,
    placing: Option<JoinHandle<ProviderResult<CallId>>>,
    place_reply: Option<oneshot::Sender<Result<CallId, LiveVoiceError>>>,
    ring_deadline: Option<Instant>,
    reset_deadline: Option<Instant>,
    status_deadline: Option<Instant>,
    status_check: Option<JoinHandle<ProviderResult<CallDetails>>>,
    opening: Option<JoinHandle<Option<LevelStream>>>,
    levels: Option<LevelStream>,
    retrieval: Option<Retrieval>,
    pending: Option<PendingRecording>,
}

/// Wartet auf einen optionalen Task, ohne Task nie fertig
async fn join_opt<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

async fn next_level(levels: &mut Option<LevelStream>) -> Option<f32> {
    match levels {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn join_retrieval(
    retrieval: &mut Option<Retrieval>,
) -> Result<Result<PendingRecording, RetrievalError>, JoinError> {
    match retrieval {
        Some(r) => (&mut r.task).await,
        None => std::future::pending().await,
    }
}

impl CallActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => break,
                },

                placed = join_opt(&mut self.placing) => {
                    self.placing = None;
                    let result = placed.unwrap_or_else(|e| {
                        Err(ProviderError::Http(format!("Platzierung abgebrochen: {e}")))
                    });
                    self.on_placed(result);
                }

                _ = sleep_opt(self.ring_deadline) => {
                    self.ring_deadline = None;
                    debug!("Klingelfenster abgelaufen");
                    self.answer();
                }

                opened = join_opt(&mut self.opening) => {
                    self.opening = None;
                    if self.state == CallState::Active {
                        self.levels = opened.ok().flatten();
                    }
                }

                level = next_level(&mut self.levels) => match level {
                    Some(level) => self.observer.on_level(level),
                    None => {
                        debug!("Live-Mitschnitt beendet, frage Status ab");
                        self.levels = None;
                        if self.state == CallState::Active && self.status_check.is_none() {
                            self.status_deadline = Some(Instant::now());
                        }
                    }
                },

                _ = sleep_opt(self.status_deadline) => {
                    self.status_deadline = None;
                    self.check_status();
                }

                checked = join_opt(&mut self.status_check) => {
                    self.status_check = None;
                    self.on_status(checked);
                }

                done = join_retrieval(&mut self.retrieval) => {
                    self.retrieval = None;
                    self.on_retrieved(done);
                }

                _ = sleep_opt(self.reset_deadline) => {
                    self.reset_deadline = None;
                    self.transition(CallTrigger::Reset);
                }
            }
        }

        // Alle Handles weg: laufenden Anruf beenden
        if self.state.in_call() {
            self.end(CallTrigger::HangUp);
        }
        self.ring.stop();
        if let Some(r) = self.retrieval.take() {
            r.cancel.cancel();
        }
        debug!("Anruf-Steuerung beendet");
    }

    fn transition(&mut self, trigger: CallTrigger) -> bool {
        let Some(next) = self.state.next(trigger) else {
            debug!(state = %self.state, ?trigger, "Ausloeser ohne Wirkung");
            return false;
        };
        let from = std::mem::replace(&mut self.state, next);
        self.state_tx.send_replace(next);
        match self.record.as_mut() {
            Some(r) => {
                // Der Datensatz behaelt nach dem Zuruecksetzen seinen Endstand
                if next != CallState::Idle {
                    r.status = next;
                }
                info!(call_id = %r.id, %from, to = %next, "Anruf-Zustand");
            }
            None => info!(%from, to = %next, "Anruf-Zustand"),
        }
        self.publish_record();
        self.observer.on_state_change(from, next);
        true
    }

    fn set_recording(&self, status: RecordingStatus) {
        self.recording_tx.send_replace(status);
    }

    fn publish_record(&self) {
        self.record_tx.send_replace(self.record.clone());
    }

    // -----------------------------------------------------------------------
    // Befehle
    // -----------------------------------------------------------------------

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Place(request, reply) => self.place(request, reply),
            Command::HangUp(ack) => {
                if self.state.in_call() {
                    self.end(CallTrigger::HangUp);
                }
                let _ = ack.send(());
            }
            Command::Answered => {
                if self.state == CallState::Ringing && self.record.is_some() {
                    debug!("Provider meldet Abheben");
                    self.answer();
                } else {
                    debug!(state = %self.state, "Abheben-Signal ignoriert");
                }
            }
            Command::RemoteEnded => {
                if self.state.in_call() {
                    self.end(CallTrigger::RemoteEnded);
                }
            }
            Command::Confirm(outcome, reply) => {
                let result = match self.pending.take() {
                    Some(pending) => {
                        let saved = pending.with_outcome(outcome).confirm();
                        info!(
                            call_id = %saved.call_id,
                            outcome = outcome.as_str(),
                            wiedervorlage = ?saved.follow_up_due,
                            "Aufnahme gespeichert"
                        );
                        self.set_recording(RecordingStatus::None);
                        Ok(saved)
                    }
                    None => Err(LiveVoiceError::RecordingUnavailable(
                        "keine Aufnahme zum Speichern".into(),
                    )),
                };
                let _ = reply.send(result);
            }
            Command::Discard => self.discard(),
        }
    }

    fn place(
        &mut self,
        request: CallRequest,
        reply: oneshot::Sender<Result<CallId, LiveVoiceError>>,
    ) {
        if !self.state.can_place() {
            let _ = reply.send(Err(LiveVoiceError::CallPlacementFailure(format!(
                "es laeuft bereits ein Anruf ({})",
                self.state
            ))));
            return;
        }

        // Vorheriger Anruf ist abgeschlossen
        self.discard();
        self.reset_deadline = None;
        self.record = None;
        self.publish_record();
        self.destination = request.destination.clone();

        self.transition(CallTrigger::Place);
        self.ring.start();

        let provider = Arc::clone(&self.provider);
        self.placing = Some(tokio::spawn(async move { provider.place_call(&request).await }));
        self.place_reply = Some(reply);
    }

    fn on_placed(&mut self, result: ProviderResult<CallId>) {
        match result {
            Ok(id) => {
                info!(call_id = %id, "Anruf platziert");
                self.observer.on_placed(&id);
                self.record = Some(CallRecord::new(id.clone(), self.destination.clone()));
                self.publish_record();
                self.ring_deadline = self.config.answer.deadline(Instant::now());
                if let Some(reply) = self.place_reply.take() {
                    let _ = reply.send(Ok(id));
                }
            }
            Err(e) => {
                let error = LiveVoiceError::CallPlacementFailure(e.to_string());
                error!("Anruf konnte nicht platziert werden: {}", e);
                self.ring.stop();
                self.transition(CallTrigger::PlacementFailed);
                self.observer.on_error(&error);
                self.reset_deadline = Some(Instant::now() + self.config.reset_after);
                if let Some(reply) = self.place_reply.take() {
                    let _ = reply.send(Err(error));
                }
            }
        }
    }

    fn answer(&mut self) {
        self.ring_deadline = None;
        self.ring.stop();
        if !self.transition(CallTrigger::Answered) {
            return;
        }
        let Some(record) = self.record.as_mut() else {
            return;
        };
        record.mark_answered();
        let id = record.id.clone();
        self.publish_record();
        self.status_deadline = self.config.status_poll.map(|d| Instant::now() + d);

        if let Some(monitor) = self.monitor.clone() {
            let provider = Arc::clone(&self.provider);
            self.opening = Some(tokio::spawn(async move {
                let oeffnen = async {
                    let url = match provider.monitor_url(&id).await {
                        Ok(Some(url)) => url,
                        Ok(None) => {
                            debug!(call_id = %id, "Kein Live-Mitschnitt angeboten");
                            return None;
                        }
                        Err(e) => {
                            warn!(call_id = %id, "Live-Mitschnitt nicht verfuegbar: {}", e);
                            return None;
                        }
                    };
                    match monitor.open(&url).await {
                        Ok(stream) => Some(stream),
                        Err(e) => {
                            warn!(call_id = %id, "Live-Mitschnitt nicht verfuegbar: {}", e);
                            None
                        }
                    }
                };
                tokio::time::timeout(MONITOR_TIMEOUT, oeffnen)
                    .await
                    .ok()
                    .flatten()
            }));
        }
    }

    /// Beendet den Anruf, Klingeln stoppt sofort
    fn end(&mut self, trigger: CallTrigger) {
        let war_aktiv = self.state == CallState::Active;
        self.ring.stop();
        self.ring_deadline = None;
        if let Some(task) = self.opening.take() {
            task.abort();
        }
        self.levels = None;
        self.status_deadline = None;
        if let Some(task) = self.status_check.take() {
            task.abort();
        }

        if let Some(task) = self.placing.take() {
            task.abort();
            if let Some(reply) = self.place_reply.take() {
                let _ = reply.send(Err(LiveVoiceError::CallPlacementFailure(
                    "vor der Platzierung aufgelegt".into(),
                )));
            }
        }

        if self.state.next(trigger).is_none() {
            debug!(state = %self.state, ?trigger, "Ausloeser ohne Wirkung");
            return;
        }
        // Beobachter von `Ended` sehen den Abruf bereits laufen
        if war_aktiv && self.record.is_some() {
            self.set_recording(RecordingStatus::Fetching);
        }
        self.transition(trigger);
        self.reset_deadline = Some(Instant::now() + self.config.reset_after);

        let Some(record) = self.record.as_mut() else {
            return;
        };
        record.mark_ended();
        if war_aktiv {
            record.duration_secs = Some(record.elapsed_secs());
        }
        self.publish_record();
        let Some(record) = self.record.as_ref() else {
            return;
        };

        if trigger == CallTrigger::HangUp {
            let provider = Arc::clone(&self.provider);
            let id = record.id.clone();
            tokio::spawn(async move {
                if let Err(e) = provider.end_call(&id).await {
                    warn!(call_id = %id, "Auflegen beim Provider fehlgeschlagen: {}", e);
                }
            });
        }

        if war_aktiv {
            let request = RetrievalRequest {
                call_id: record.id.clone(),
                started_at: record.started_at.unwrap_or(record.placed_at),
                fallback_secs: record.elapsed_secs(),
            };
            self.start_retrieval(request);
        }
    }

    // -----------------------------------------------------------------------
    // Status beim Provider
    // -----------------------------------------------------------------------

    fn check_status(&mut self) {
        if self.state != CallState::Active || self.status_check.is_some() {
            return;
        }
        let Some(record) = self.record.as_ref() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let id = record.id.clone();
        self.status_check = Some(tokio::spawn(async move {
            provider.get_call_details(&id).await
        }));
    }

    fn on_status(&mut self, checked: Result<ProviderResult<CallDetails>, JoinError>) {
        if self.state != CallState::Active {
            return;
        }
        match checked {
            Ok(Ok(details)) if details.completed => {
                info!(status = ?details.status, "Provider meldet Anrufende");
                self.end(CallTrigger::RemoteEnded);
                return;
            }
            Ok(Ok(details)) => debug!(status = ?details.status, "Anruf laeuft"),
            Ok(Err(e)) => warn!("Statusabfrage fehlgeschlagen: {}", e),
            Err(e) => warn!("Statusabfrage abgebrochen: {}", e),
        }
        self.status_deadline = self.config.status_poll.map(|d| Instant::now() + d);
    }

    // -----------------------------------------------------------------------
    // Aufnahme
    // -----------------------------------------------------------------------

    fn start_retrieval(&mut self, request: RetrievalRequest) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let provider = Arc::clone(&self.provider);
        let policy = self.config.retrieval;
        debug!(call_id = %request.call_id, "Aufnahme-Abruf gestartet");

        let task = tokio::spawn(async move {
            retrieve_recording(provider.as_ref(), &request, &policy, &token).await
        });
        self.retrieval = Some(Retrieval { cancel, task });
        self.set_recording(RecordingStatus::Fetching);
    }

    fn on_retrieved(&mut self, done: Result<Result<PendingRecording, RetrievalError>, JoinError>) {
        match done {
            Ok(Ok(recording)) => {
                if let Some(record) = self.record.as_mut() {
                    record.recording_url = Some(recording.url.clone());
                    record.duration_secs = Some(recording.duration_secs);
                }
                self.publish_record();
                self.observer.on_recording(&recording);
                self.set_recording(RecordingStatus::Ready(recording.clone()));
                self.pending = Some(recording);
            }
            Ok(Err(e)) => {
                if let Some(error) = e.into_error() {
                    warn!("{}", error);
                    self.observer.on_error(&error);
                    self.set_recording(RecordingStatus::Unavailable);
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                error!("Aufnahme-Abruf abgestuerzt: {}", e);
                self.set_recording(RecordingStatus::Unavailable);
            }
        }
    }

    fn discard(&mut self) {
        if let Some(r) = self.retrieval.take() {
            r.cancel.cancel();
            debug!("Laufender Aufnahme-Abruf abgebrochen");
        }
        if self.pending.take().is_some() {
            debug!("Aufnahme verworfen");
        }
        self.set_recording(RecordingStatus::None);
    }
}
