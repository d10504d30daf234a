//! Anruf-Datensatz und Aufnahmen

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use livevoice_core::CallId;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::state::CallState;

/// Frist fuer die Wiedervorlage nach einem `FollowUp`
pub const FOLLOW_UP_AFTER_HOURS: i64 = 24;

/// Ergebnis eines Gespraechs, vom Nutzer vor dem Speichern gewaehlt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    #[default]
    Connected,
    Missed,
    Voicemail,
    FollowUp,
    Closed,
}

impl CallOutcome {
    pub const ALLE: [CallOutcome; 5] = [
        Self::Connected,
        Self::Missed,
        Self::Voicemail,
        Self::FollowUp,
        Self::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Missed => "missed",
            Self::Voicemail => "voicemail",
            Self::FollowUp => "follow_up",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALLE.into_iter().find(|o| o.as_str() == s)
    }
}

/// Lokaler Stand eines platzierten Anrufs
///
/// Nur die Anruf-Steuerung und der Aufnahme-Abruf schreiben hinein.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: CallId,
    pub destination: String,
    /// Letzter Zustand ausser `Idle`
    pub status: CallState,
    pub placed_at: DateTime<Utc>,
    /// Wanduhrzeit des Abhebens
    pub started_at: Option<DateTime<Utc>>,
    /// Erst nach erfolgreichem Abruf gesetzt
    pub recording_url: Option<String>,
    /// Lokal gemessen bei Anrufende, vom Abruf durch die Provider-Dauer ersetzt
    pub duration_secs: Option<u64>,
    answered: Option<Instant>,
    ended: Option<Instant>,
}

impl CallRecord {
    pub fn new(id: CallId, destination: impl Into<String>) -> Self {
        Self {
            id,
            destination: destination.into(),
            status: CallState::Ringing,
            placed_at: Utc::now(),
            started_at: None,
            recording_url: None,
            duration_secs: None,
            answered: None,
            ended: None,
        }
    }

    pub(crate) fn mark_answered(&mut self) {
        self.started_at = Some(Utc::now());
        self.answered = Some(Instant::now());
    }

    pub(crate) fn mark_ended(&mut self) {
        self.ended.get_or_insert_with(Instant::now);
    }

    /// Lokal gemessene Gespraechsdauer in ganzen Sekunden (abgerundet)
    pub fn elapsed_secs(&self) -> u64 {
        match (self.answered, self.ended) {
            (Some(a), Some(e)) => e.saturating_duration_since(a).as_secs(),
            (Some(a), None) => a.elapsed().as_secs(),
            _ => 0,
        }
    }
}

/// Gefundene, noch nicht gespeicherte Aufnahme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecording {
    pub call_id: CallId,
    pub url: String,
    pub duration_secs: u64,
    /// Beginn des Gespraechs
    pub started_at: DateTime<Utc>,
    pub outcome: CallOutcome,
}

impl PendingRecording {
    pub fn with_outcome(mut self, outcome: CallOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Uebernimmt die Aufnahme, Wiedervorlage relativ zu `now`
    pub fn confirm_at(self, now: DateTime<Utc>) -> SavedRecording {
        let follow_up_due = (self.outcome == CallOutcome::FollowUp)
            .then(|| now + ChronoDuration::hours(FOLLOW_UP_AFTER_HOURS));
        SavedRecording {
            call_id: self.call_id,
            url: self.url,
            duration_secs: self.duration_secs,
            started_at: self.started_at,
            saved_at: now,
            outcome: self.outcome,
            follow_up_due,
        }
    }

    pub fn confirm(self) -> SavedRecording {
        self.confirm_at(Utc::now())
    }

    /// Dateiname fuer einen Download
    pub fn file_name(&self) -> String {
        format!(
            "call-recording-{}.mp3",
            self.started_at.format("%Y-%m-%dT%H-%M-%SZ")
        )
    }
}

/// Gespeicherte Aufnahme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRecording {
    pub call_id: CallId,
    pub url: String,
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub outcome: CallOutcome,
    /// Faelligkeit der Wiedervorlage bei `FollowUp`
    pub follow_up_due: Option<DateTime<Utc>>,
}
