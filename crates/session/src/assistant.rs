//! Sprachassistent: hoechstens eine aktive Session

use std::sync::Arc;

use livevoice_audio::{AudioInput, AudioOutput};
use livevoice_core::LiveVoiceError;
use livevoice_tools::ToolBridge;
use tokio::sync::Mutex;
use tracing::info;

use crate::channel::{SessionChannel, SessionConfig, SessionHandle, SessionSummary};
use crate::observer::SessionObserver;
use crate::transport::AgentTransport;

/// Startet und beendet Sessions mit fester Konfiguration
///
/// Solange eine Session nicht abgeschlossen ist, schlaegt ein weiterer
/// Start mit `SessionAlreadyActive` fehl.
pub struct VoiceAssistant {
    transport: Arc<dyn AgentTransport>,
    bridge: ToolBridge,
    config: SessionConfig,
    active: Mutex<Option<SessionHandle>>,
}

impl VoiceAssistant {
    pub fn new(transport: Arc<dyn AgentTransport>, bridge: ToolBridge, config: SessionConfig) -> Self {
        Self {
            transport,
            bridge,
            config,
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn bridge(&self) -> &ToolBridge {
        &self.bridge
    }

    /// Startet eine neue Session
    pub async fn start(
        &self,
        input: Box<dyn AudioInput>,
        output: Box<dyn AudioOutput>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<SessionHandle, LiveVoiceError> {
        // Sperre ueber den ganzen Aufbau, parallele Starts warten hier
        let mut active = self.active.lock().await;
        if let Some(handle) = active.as_ref() {
            if !handle.state().is_terminal() {
                return Err(LiveVoiceError::SessionAlreadyActive);
            }
        }

        let handle = SessionChannel::connect(
            self.config.clone(),
            Arc::clone(&self.transport),
            input,
            output,
            self.bridge.clone(),
            observer,
        )
        .await?;
        info!(session_id = %handle.id(), "Assistent gestartet");
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Beendet die aktive Session und wartet auf ihren Abbau
    pub async fn stop(&self) -> Option<SessionSummary> {
        let handle = self.active.lock().await.take()?;
        handle.disconnect().await;
        Some(handle.closed().await)
    }

    /// Aktive, noch nicht abgeschlossene Session
    pub async fn active(&self) -> Option<SessionHandle> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|h| !h.state().is_terminal())
            .cloned()
    }
}
