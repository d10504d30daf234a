//! Beobachter-Schnittstelle einer Session
//!
//! Alle Methoden werden aus dem Session-Task aufgerufen und muessen sofort
//! zurueckkehren. Wer asynchron reagieren will, nimmt den
//! [`ChannelObserver`] und verarbeitet die [`SessionEvent`]s woanders.

use livevoice_core::{CloseReason, LiveVoiceError};
use livevoice_tools::ToolResult;
use tokio::sync::mpsc;

use crate::state::{SessionParams, SessionState};

/// Callbacks einer Session, alle mit leerer Standard-Implementierung
pub trait SessionObserver: Send + Sync {
    fn on_state_change(&self, _from: SessionState, _to: SessionState) {}

    /// Session ist offen, Capture laeuft
    fn on_connect(&self, _params: &SessionParams) {}

    /// Session ist vollstaendig abgebaut
    fn on_disconnect(&self, _reason: &CloseReason) {}

    fn on_error(&self, _error: &LiveVoiceError) {}

    /// Agenten-Audio beginnt oder endet
    fn on_agent_speaking(&self, _speaking: bool) {}

    fn on_user_transcript(&self, _text: &str) {}

    fn on_agent_transcript(&self, _text: &str) {}

    /// RMS-Pegel jedes Mikrofon-Chunks, auch wenn stummgeschaltet
    fn on_input_level(&self, _level: f32) {}

    /// Barge-in: Wiedergabe wurde verworfen
    fn on_interrupted(&self) {}

    fn on_tool_result(&self, _result: &ToolResult) {}
}

/// Beobachter ohne Reaktion
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Ereignis einer Session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged { from: SessionState, to: SessionState },
    Connected(SessionParams),
    Disconnected(CloseReason),
    Error(LiveVoiceError),
    AgentSpeaking(bool),
    UserTranscript(String),
    AgentTranscript(String),
    InputLevel(f32),
    Interrupted,
    ToolResult(ToolResult),
}

/// Leitet alle Callbacks als [`SessionEvent`] in einen Kanal
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        // Empfaenger weg: Ereignisse verfallen
        let _ = self.tx.send(event);
    }
}

impl SessionObserver for ChannelObserver {
    fn on_state_change(&self, from: SessionState, to: SessionState) {
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn on_connect(&self, params: &SessionParams) {
        self.emit(SessionEvent::Connected(*params));
    }

    fn on_disconnect(&self, reason: &CloseReason) {
        self.emit(SessionEvent::Disconnected(reason.clone()));
    }

    fn on_error(&self, error: &LiveVoiceError) {
        self.emit(SessionEvent::Error(error.clone()));
    }

    fn on_agent_speaking(&self, speaking: bool) {
        self.emit(SessionEvent::AgentSpeaking(speaking));
    }

    fn on_user_transcript(&self, text: &str) {
        self.emit(SessionEvent::UserTranscript(text.to_string()));
    }

    fn on_agent_transcript(&self, text: &str) {
        self.emit(SessionEvent::AgentTranscript(text.to_string()));
    }

    fn on_input_level(&self, level: f32) {
        self.emit(SessionEvent::InputLevel(level));
    }

    fn on_interrupted(&self) {
        self.emit(SessionEvent::Interrupted);
    }

    fn on_tool_result(&self, result: &ToolResult) {
        self.emit(SessionEvent::ToolResult(result.clone()));
    }
}
