//! Integration-Tests fuer den Anruf-Lebenszyklus (Provider im Speicher, Zeit pausiert)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livevoice_call::{
    AnswerPolicy, CallConfig, CallController, CallDetails, CallEvent, CallHandle, CallOutcome,
    CallProvider, CallRequest, CallState, ChannelCallObserver, LevelMonitor, LevelStream, Persona,
    ProviderError, ProviderResult, RecordingStatus, RingIndicator,
};
use livevoice_core::{CallId, LiveVoiceError};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Attrappen
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockProvider {
    ablehnen: bool,
    details: Mutex<VecDeque<CallDetails>>,
    monitor: Option<String>,
    detail_aufrufe: AtomicU32,
    auflegen: AtomicU32,
}

impl MockProvider {
    fn mit_details(details: impl IntoIterator<Item = CallDetails>) -> Self {
        Self {
            details: Mutex::new(details.into_iter().collect()),
            ..Default::default()
        }
    }

    fn detail_aufrufe(&self) -> u32 {
        self.detail_aufrufe.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallProvider for MockProvider {
    async fn place_call(&self, request: &CallRequest) -> ProviderResult<CallId> {
        if self.ablehnen {
            return Err(ProviderError::Abgelehnt("Nummer ungueltig".into()));
        }
        Ok(CallId::new(format!("c-{}", request.destination)))
    }

    async fn get_call_details(&self, _id: &CallId) -> ProviderResult<CallDetails> {
        self.detail_aufrufe.fetch_add(1, Ordering::SeqCst);
        Ok(self.details.lock().pop_front().unwrap_or_default())
    }

    async fn monitor_url(&self, _id: &CallId) -> ProviderResult<Option<String>> {
        Ok(self.monitor.clone())
    }

    async fn end_call(&self, _id: &CallId) -> ProviderResult<()> {
        self.auflegen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MockRing {
    starts: Arc<AtomicU32>,
    ringing: Arc<AtomicBool>,
}

impl RingIndicator for MockRing {
    fn start(&mut self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.ringing.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.ringing.store(false, Ordering::SeqCst);
    }

    fn is_ringing(&self) -> bool {
        self.ringing.load(Ordering::SeqCst)
    }
}

struct MockMonitor {
    stream: Mutex<Option<(mpsc::UnboundedReceiver<f32>, CancellationToken)>>,
}

#[async_trait]
impl LevelMonitor for MockMonitor {
    async fn open(&self, url: &str) -> Result<LevelStream, ProviderError> {
        assert_eq!(url, "wss://monitor/c-1");
        let (rx, token) = self
            .stream
            .lock()
            .take()
            .ok_or_else(|| ProviderError::Http("bereits geoeffnet".into()))?;
        Ok(LevelStream::new(rx, token))
    }
}

fn fertig(url: &str, dauer: Option<u64>) -> CallDetails {
    CallDetails {
        status: Some("completed".into()),
        completed: true,
        recording_url: Some(url.into()),
        duration_secs: dauer,
    }
}

fn laufend() -> CallDetails {
    CallDetails {
        status: Some("in-progress".into()),
        ..Default::default()
    }
}

/// Ohne Statusabfrage, damit die Abrufe des Aufnahme-Abrufs zaehlbar bleiben
fn konfig() -> CallConfig {
    CallConfig {
        status_poll: None,
        ..Default::default()
    }
}

fn anfrage() -> CallRequest {
    CallRequest::new(
        "1",
        Persona {
            name: "Laurent".into(),
            voice: "v-1".into(),
            prompt: "Qualifiziere den Lead".into(),
            first_sentence: "Hallo!".into(),
        },
    )
}

struct Aufbau {
    handle: CallHandle,
    provider: Arc<MockProvider>,
    ring: MockRing,
    events: mpsc::UnboundedReceiver<CallEvent>,
}

fn steuerung(provider: MockProvider, config: CallConfig) -> Aufbau {
    let provider = Arc::new(provider);
    let ring = MockRing::default();
    let (observer, events) = ChannelCallObserver::new();
    let handle = CallController::new(provider.clone(), config)
        .with_ring(Box::new(ring.clone()))
        .with_observer(Arc::new(observer))
        .spawn();
    Aufbau {
        handle,
        provider,
        ring,
        events,
    }
}

async fn warte_zustand(handle: &CallHandle, ziel: CallState) {
    let mut rx = handle.subscribe_state();
    tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|s| *s == ziel))
        .await
        .expect("Zustand nicht erreicht")
        .expect("Steuerung beendet");
}

fn zustaende(events: &mut mpsc::UnboundedReceiver<CallEvent>) -> Vec<CallState> {
    let mut out = Vec::new();
    while let Ok(e) = events.try_recv() {
        if let CallEvent::StateChanged { to, .. } = e {
            out.push(to);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abgelehnter_anruf_ohne_abruf() {
    let mut a = steuerung(
        MockProvider {
            ablehnen: true,
            ..Default::default()
        },
        konfig(),
    );

    let err = a.handle.place(anfrage()).await.unwrap_err();
    assert!(matches!(err, LiveVoiceError::CallPlacementFailure(_)));
    assert_eq!(a.handle.state(), CallState::Error);
    assert_eq!(a.ring.starts.load(Ordering::SeqCst), 1);
    assert!(!a.ring.is_ringing());

    warte_zustand(&a.handle, CallState::Idle).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(a.provider.detail_aufrufe(), 0);
    assert_eq!(a.handle.recording(), RecordingStatus::None);
    assert_eq!(
        zustaende(&mut a.events),
        [CallState::Ringing, CallState::Error, CallState::Idle]
    );
}

#[tokio::test(start_paused = true)]
async fn angenommener_anruf_ruft_aufnahme_ab() {
    let mut a = steuerung(
        MockProvider::mit_details([CallDetails::default(), fertig("https://rec/1.mp3", Some(95))]),
        konfig(),
    );

    let id = a.handle.place(anfrage()).await.unwrap();
    assert_eq!(id, CallId::new("c-1"));
    assert_eq!(a.handle.state(), CallState::Ringing);
    assert!(a.ring.is_ringing());

    // Nach dem Klingelfenster gilt der Anruf als angenommen
    tokio::time::sleep(Duration::from_millis(8_900)).await;
    assert_eq!(a.handle.state(), CallState::Ringing);
    warte_zustand(&a.handle, CallState::Active).await;
    assert!(!a.ring.is_ringing());

    tokio::time::sleep(Duration::from_secs(30)).await;
    a.handle.hang_up().await;
    assert_eq!(a.handle.state(), CallState::Ended);

    let status = a.handle.settled_recording().await;
    let RecordingStatus::Ready(rec) = status else {
        panic!("Erwartet Aufnahme, erhalten {status:?}");
    };
    assert_eq!(rec.url, "https://rec/1.mp3");
    assert_eq!(rec.duration_secs, 95);
    assert_eq!(a.provider.detail_aufrufe(), 2);
    assert_eq!(a.provider.auflegen.load(Ordering::SeqCst), 1);

    let gespeichert = a
        .handle
        .confirm_recording(CallOutcome::FollowUp)
        .await
        .unwrap();
    assert_eq!(gespeichert.outcome, CallOutcome::FollowUp);
    assert_eq!(
        gespeichert.follow_up_due,
        Some(gespeichert.saved_at + chrono::Duration::hours(24))
    );
    assert_eq!(a.handle.recording(), RecordingStatus::None);

    warte_zustand(&a.handle, CallState::Idle).await;
    let mut platziert = false;
    while let Ok(e) = a.events.try_recv() {
        assert!(!matches!(e, CallEvent::Error(_)), "unerwarteter Fehler: {e:?}");
        platziert |= matches!(e, CallEvent::Placed(_));
    }
    assert!(platziert);
}

#[tokio::test(start_paused = true)]
async fn ohne_providerdauer_lokale_messung() {
    let a = steuerung(
        MockProvider::mit_details([fertig("https://rec/2.mp3", None)]),
        konfig(),
    );

    a.handle.place(anfrage()).await.unwrap();
    warte_zustand(&a.handle, CallState::Active).await;
    tokio::time::sleep(Duration::from_millis(42_500)).await;
    a.handle.remote_ended();
    warte_zustand(&a.handle, CallState::Ended).await;

    match a.handle.settled_recording().await {
        RecordingStatus::Ready(rec) => assert_eq!(rec.duration_secs, 42),
        other => panic!("Erwartet Aufnahme, erhalten {other:?}"),
    }
    // Vom Provider beendet: kein Auflegen noetig
    assert_eq!(a.provider.auflegen.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn fehlende_aufnahme_ist_kein_fehlschlag() {
    let mut a = steuerung(MockProvider::default(), konfig());

    a.handle.place(anfrage()).await.unwrap();
    warte_zustand(&a.handle, CallState::Active).await;
    a.handle.hang_up().await;

    assert_eq!(a.handle.settled_recording().await, RecordingStatus::Unavailable);
    assert_eq!(a.provider.detail_aufrufe(), 3);

    let mut fehler = Vec::new();
    let mut zustaende = Vec::new();
    while let Ok(e) = a.events.try_recv() {
        match e {
            CallEvent::Error(err) => fehler.push(err),
            CallEvent::StateChanged { to, .. } => zustaende.push(to),
            _ => {}
        }
    }
    assert_eq!(fehler.len(), 1);
    assert!(fehler[0].is_degraded());
    assert!(!zustaende.contains(&CallState::Error));

    let err = a
        .handle
        .confirm_recording(CallOutcome::Connected)
        .await
        .unwrap_err();
    assert!(matches!(err, LiveVoiceError::RecordingUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn auflegen_waehrend_es_klingelt() {
    let a = steuerung(
        MockProvider::mit_details([fertig("https://rec/3.mp3", Some(1))]),
        konfig(),
    );

    a.handle.place(anfrage()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    a.handle.hang_up().await;

    assert_eq!(a.handle.state(), CallState::Ended);
    assert!(!a.ring.is_ringing());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(a.handle.state(), CallState::Idle);
    assert_eq!(a.provider.detail_aufrufe(), 0);
    assert_eq!(a.provider.auflegen.load(Ordering::SeqCst), 1);
    assert_eq!(a.handle.recording(), RecordingStatus::None);
}

#[tokio::test(start_paused = true)]
async fn verwerfen_bricht_abruf_ab() {
    let a = steuerung(
        MockProvider::mit_details([fertig("https://rec/4.mp3", Some(1))]),
        konfig(),
    );

    a.handle.place(anfrage()).await.unwrap();
    warte_zustand(&a.handle, CallState::Active).await;
    a.handle.hang_up().await;
    assert_eq!(a.handle.recording(), RecordingStatus::Fetching);

    a.handle.discard_recording();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(a.provider.detail_aufrufe(), 0);
    assert_eq!(a.handle.recording(), RecordingStatus::None);
}

#[tokio::test(start_paused = true)]
async fn provider_signal_steuert_abheben() {
    let a = steuerung(
        MockProvider::default(),
        CallConfig {
            answer: AnswerPolicy::ProviderSignal { fallback: None },
            ..konfig()
        },
    );

    a.handle.place(anfrage()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(a.handle.state(), CallState::Ringing);
    assert!(a.ring.is_ringing());

    a.handle.answered();
    warte_zustand(&a.handle, CallState::Active).await;
    assert!(!a.ring.is_ringing());
}

#[tokio::test(start_paused = true)]
async fn provider_signal_mit_ersatzfrist() {
    let a = steuerung(
        MockProvider::default(),
        CallConfig {
            answer: AnswerPolicy::ProviderSignal {
                fallback: Some(Duration::from_secs(20)),
            },
            ..konfig()
        },
    );

    a.handle.place(anfrage()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(19)).await;
    assert_eq!(a.handle.state(), CallState::Ringing);
    warte_zustand(&a.handle, CallState::Active).await;
}

#[tokio::test(start_paused = true)]
async fn live_pegel_an_beobachter() {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    let monitor = Arc::new(MockMonitor {
        stream: Mutex::new(Some((rx, token.clone()))),
    });

    let provider = Arc::new(MockProvider {
        monitor: Some("wss://monitor/c-1".into()),
        ..Default::default()
    });
    let (observer, mut events) = ChannelCallObserver::new();
    let handle = CallController::new(provider, konfig())
        .with_monitor(monitor)
        .with_observer(Arc::new(observer))
        .spawn();

    handle.place(anfrage()).await.unwrap();
    warte_zustand(&handle, CallState::Active).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    tx.send(0.3).unwrap();
    let pegel = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(CallEvent::Level(l)) = events.recv().await {
                return l;
            }
        }
    })
    .await
    .unwrap();
    assert!((pegel - 0.3).abs() < f32::EPSILON);

    handle.hang_up().await;
    assert!(token.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn zweiter_anruf_waehrend_aktiv_abgelehnt() {
    let a = steuerung(MockProvider::default(), konfig());

    a.handle.place(anfrage()).await.unwrap();
    let err = a.handle.place(anfrage()).await.unwrap_err();
    assert!(matches!(err, LiveVoiceError::CallPlacementFailure(_)));
    assert_eq!(a.handle.state(), CallState::Ringing);
    assert_eq!(a.ring.starts.load(Ordering::SeqCst), 1);

    // Aus Ended darf sofort neu gewaehlt werden
    a.handle.hang_up().await;
    a.handle.place(anfrage()).await.unwrap();
    assert_eq!(a.handle.state(), CallState::Ringing);
    assert_eq!(a.ring.starts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn provider_ende_beendet_aktiven_anruf() {
    let mut a = steuerung(
        MockProvider::mit_details([
            laufend(),
            fertig("https://rec/5.mp3", Some(30)),
            fertig("https://rec/5.mp3", Some(30)),
        ]),
        CallConfig::default(),
    );

    a.handle.place(anfrage()).await.unwrap();
    warte_zustand(&a.handle, CallState::Active).await;
    let record = a.handle.record().unwrap();
    assert_eq!(record.status, CallState::Active);
    assert!(record.started_at.is_some());

    // Erste Abfrage: laeuft noch, zweite: abgeschlossen
    warte_zustand(&a.handle, CallState::Ended).await;
    assert_eq!(a.provider.detail_aufrufe(), 2);
    assert_eq!(a.provider.auflegen.load(Ordering::SeqCst), 0);

    let RecordingStatus::Ready(rec) = a.handle.settled_recording().await else {
        panic!("Aufnahme erwartet");
    };
    assert_eq!(rec.url, "https://rec/5.mp3");
    assert_eq!(a.provider.detail_aufrufe(), 3);

    let record = a.handle.record().unwrap();
    assert_eq!(record.status, CallState::Ended);
    assert_eq!(record.recording_url.as_deref(), Some("https://rec/5.mp3"));
    assert_eq!(record.duration_secs, Some(30));

    // Nach dem Zuruecksetzen bleibt der Endstand erhalten
    warte_zustand(&a.handle, CallState::Idle).await;
    assert_eq!(a.handle.record().unwrap().status, CallState::Ended);
    assert_eq!(
        zustaende(&mut a.events),
        [
            CallState::Ringing,
            CallState::Active,
            CallState::Ended,
            CallState::Idle
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn statusabfrage_nur_waehrend_aktiv() {
    let a = steuerung(MockProvider::default(), CallConfig::default());

    a.handle.place(anfrage()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(a.handle.state(), CallState::Ringing);
    assert_eq!(a.provider.detail_aufrufe(), 0);

    warte_zustand(&a.handle, CallState::Active).await;
    tokio::time::sleep(Duration::from_secs(26)).await;
    // Abfragen nach 5, 10, 15, 20 und 25 Sekunden
    assert_eq!(a.provider.detail_aufrufe(), 5);
    assert_eq!(a.handle.state(), CallState::Active);

    // Kein Abruf, damit nur Statusabfragen zaehlen
    a.handle.hang_up().await;
    a.handle.discard_recording();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(a.provider.detail_aufrufe(), 5);
}

#[tokio::test(start_paused = true)]
async fn ende_des_mitschnitts_loest_statusabfrage_aus() {
    let (tx, rx) = mpsc::unbounded_channel();
    let monitor = Arc::new(MockMonitor {
        stream: Mutex::new(Some((rx, CancellationToken::new()))),
    });
    let provider = Arc::new(MockProvider {
        details: Mutex::new([fertig("https://rec/6.mp3", Some(12))].into()),
        monitor: Some("wss://monitor/c-1".into()),
        ..Default::default()
    });
    let handle = CallController::new(provider.clone(), konfig())
        .with_monitor(monitor)
        .spawn();

    handle.place(anfrage()).await.unwrap();
    warte_zustand(&handle, CallState::Active).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(provider.detail_aufrufe(), 0);

    drop(tx);
    warte_zustand(&handle, CallState::Ended).await;
    assert_eq!(provider.detail_aufrufe(), 1);
    assert_eq!(provider.auflegen.load(Ordering::SeqCst), 0);
}
