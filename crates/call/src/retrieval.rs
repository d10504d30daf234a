//! Abruf der Anruf-Aufnahme
//!
//! Der Provider stellt die Aufnahme erst einige Sekunden nach dem Auflegen
//! bereit. Der Abruf wartet deshalb zuerst `initial_delay`, fragt dann
//! hoechstens `max_attempts` mal nach und wartet zwischen zwei Versuchen
//! `retry_delay`. Fehler des Providers zaehlen als Versuch. Jede Wartezeit
//! ist ueber ein [`CancellationToken`] abbrechbar.

use std::time::Duration;

use chrono::{DateTime, Utc};
use livevoice_core::{CallId, LiveVoiceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::CallProvider;
use crate::record::{CallOutcome, PendingRecording};

/// Zeitplan des Abrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalPolicy {
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("keine Aufnahme nach {versuche} Versuchen")]
    NichtVerfuegbar { versuche: u32 },

    #[error("Abruf abgebrochen")]
    Abgebrochen,
}

impl RetrievalError {
    /// `None` bei Abbruch, der kein Fehler ist
    pub fn into_error(self) -> Option<LiveVoiceError> {
        match self {
            Self::NichtVerfuegbar { .. } => {
                Some(LiveVoiceError::RecordingUnavailable(self.to_string()))
            }
            Self::Abgebrochen => None,
        }
    }
}

/// Was der Abruf ueber den Anruf wissen muss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub call_id: CallId,
    pub started_at: DateTime<Utc>,
    /// Lokal gemessene Dauer, falls der Provider keine meldet
    pub fallback_secs: u64,
}

/// Wartet `dauer`, `false` wenn vorher abgebrochen
async fn warten(dauer: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(dauer) => true,
    }
}

/// Fragt den Provider nach der Aufnahme
pub async fn retrieve_recording(
    provider: &dyn CallProvider,
    request: &RetrievalRequest,
    policy: &RetrievalPolicy,
    cancel: &CancellationToken,
) -> Result<PendingRecording, RetrievalError> {
    let versuche = policy.max_attempts.max(1);

    if !warten(policy.initial_delay, cancel).await {
        return Err(RetrievalError::Abgebrochen);
    }

    for versuch in 1..=versuche {
        let abfrage = tokio::select! {
            _ = cancel.cancelled() => return Err(RetrievalError::Abgebrochen),
            r = provider.get_call_details(&request.call_id) => r,
        };

        match abfrage {
            Ok(details) => match details.recording_url {
                Some(url) => {
                    let duration_secs = details.duration_secs.unwrap_or(request.fallback_secs);
                    info!(
                        call_id = %request.call_id,
                        versuch,
                        duration_secs,
                        "Aufnahme gefunden"
                    );
                    return Ok(PendingRecording {
                        call_id: request.call_id.clone(),
                        url,
                        duration_secs,
                        started_at: request.started_at,
                        outcome: CallOutcome::default(),
                    });
                }
                None => {
                    debug!(call_id = %request.call_id, versuch, versuche, "Aufnahme noch nicht bereit");
                }
            },
            Err(e) => {
                warn!(call_id = %request.call_id, versuch, "Anrufdetails nicht abrufbar: {}", e);
            }
        }

        if versuch < versuche && !warten(policy.retry_delay, cancel).await {
            return Err(RetrievalError::Abgebrochen);
        }
    }

    warn!(call_id = %request.call_id, versuche, "Aufnahme nicht verfuegbar");
    Err(RetrievalError::NichtVerfuegbar { versuche })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CallDetails, CallRequest, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Liefert ab dem `bereit_ab`-ten Aufruf eine URL, davor `fehler` oder nichts
    struct Verzoegert {
        aufrufe: AtomicU32,
        bereit_ab: Option<u32>,
        fehler: bool,
        laenge: Option<u64>,
    }

    impl Verzoegert {
        fn new(bereit_ab: Option<u32>) -> Self {
            Self {
                aufrufe: AtomicU32::new(0),
                bereit_ab,
                fehler: false,
                laenge: Some(95),
            }
        }

        fn aufrufe(&self) -> u32 {
            self.aufrufe.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CallProvider for Verzoegert {
        async fn place_call(&self, _request: &CallRequest) -> ProviderResult<CallId> {
            Ok(CallId::new("c"))
        }

        async fn get_call_details(&self, _id: &CallId) -> ProviderResult<CallDetails> {
            let n = self.aufrufe.fetch_add(1, Ordering::SeqCst) + 1;
            match self.bereit_ab {
                Some(k) if n >= k => Ok(CallDetails {
                    recording_url: Some("https://rec/c.mp3".into()),
                    duration_secs: self.laenge,
                    ..Default::default()
                }),
                _ if self.fehler => Err(ProviderError::Http("503".into())),
                _ => Ok(CallDetails::default()),
            }
        }
    }

    fn request() -> RetrievalRequest {
        RetrievalRequest {
            call_id: CallId::new("c"),
            started_at: Utc::now(),
            fallback_secs: 12,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn erfolg_beim_k_ten_versuch() {
        for k in 1..=3 {
            let provider = Verzoegert::new(Some(k));
            let start = Instant::now();
            let rec = retrieve_recording(
                &provider,
                &request(),
                &RetrievalPolicy::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
            assert_eq!(provider.aufrufe(), k);
            assert_eq!(rec.url, "https://rec/c.mp3");
            assert_eq!(rec.duration_secs, 95);
            assert_eq!(rec.outcome, CallOutcome::Connected);
            // 1 s Vorlauf + 2 s je Wiederholung
            assert_eq!(start.elapsed(), Duration::from_secs(1 + 2 * (u64::from(k) - 1)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn endet_nach_hoechstzahl() {
        let provider = Verzoegert::new(None);
        let err = retrieve_recording(
            &provider,
            &request(),
            &RetrievalPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, RetrievalError::NichtVerfuegbar { versuche: 3 });
        assert_eq!(provider.aufrufe(), 3);
        assert!(matches!(
            err.into_error(),
            Some(LiveVoiceError::RecordingUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn providerfehler_zaehlen_als_versuch() {
        let mut provider = Verzoegert::new(Some(3));
        provider.fehler = true;
        let rec = retrieve_recording(
            &provider,
            &request(),
            &RetrievalPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(provider.aufrufe(), 3);
        assert_eq!(rec.call_id, CallId::new("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn lokale_dauer_als_ersatz() {
        let mut provider = Verzoegert::new(Some(1));
        provider.laenge = None;
        let rec = retrieve_recording(
            &provider,
            &request(),
            &RetrievalPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(rec.duration_secs, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn abbruch_waehrend_der_wartezeit() {
        let provider = Verzoegert::new(None);
        let cancel = CancellationToken::new();
        let abbrecher = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            abbrecher.cancel();
        });

        let err = retrieve_recording(&provider, &request(), &RetrievalPolicy::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RetrievalError::Abgebrochen);
        // Erster Versuch bei 1 s, zweiter waere bei 3 s
        assert_eq!(provider.aufrufe(), 1);
        assert!(RetrievalError::Abgebrochen.into_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn null_versuche_fragt_trotzdem_einmal() {
        let provider = Verzoegert::new(Some(1));
        let policy = RetrievalPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        retrieve_recording(&provider, &request(), &policy, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(provider.aufrufe(), 1);
    }
}
