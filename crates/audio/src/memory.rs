//! Speicher-Backends ohne Audio-Hardware
//!
//! [`MemoryInput`] wird ueber einen [`MemoryInputFeeder`] von aussen mit
//! Samples gefuettert, [`MemoryOutput`] zeichnet alle geplanten Puffer auf
//! und laeuft auf einer manuell gestellten Uhr. Geeignet fuer Headless-
//! Einbettungen (z.B. Audio aus Dateien) und fuer Tests der Zustandsautomaten.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::{AudioInput, CaptureConstraints, OpenedInput, SampleSink};
use crate::error::{AudioError, AudioResult};
use crate::playback::{AudioOutput, VoiceHandle};

// ---------------------------------------------------------------------------
// Eingabe
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InputState {
    sink: Option<SampleSink>,
    opened: u32,
    closed: u32,
}

/// Eingabe-Backend aus dem Speicher
pub struct MemoryInput {
    state: Arc<Mutex<InputState>>,
    sample_rate: u32,
    native: CaptureConstraints,
    denied: Option<String>,
}

/// Fuetterungs-Seite eines [`MemoryInput`]
#[derive(Clone)]
pub struct MemoryInputFeeder {
    state: Arc<Mutex<InputState>>,
}

impl MemoryInput {
    /// Erstellt ein Backend mit gegebener Abtastrate und seinen Feeder
    pub fn new(sample_rate: u32) -> (Self, MemoryInputFeeder) {
        let state = Arc::new(Mutex::new(InputState::default()));
        let input = Self {
            state: Arc::clone(&state),
            sample_rate,
            native: CaptureConstraints::none(),
            denied: None,
        };
        (input, MemoryInputFeeder { state })
    }

    /// Backend, dessen `open` wie eine verweigerte Berechtigung scheitert
    pub fn denied(reason: impl Into<String>) -> Self {
        let (mut input, _) = Self::new(48_000);
        input.denied = Some(reason.into());
        input
    }

    /// Meldet die gegebenen Hinweise als nativ umgesetzt
    pub fn with_native(mut self, native: CaptureConstraints) -> Self {
        self.native = native;
        self
    }
}

impl AudioInput for MemoryInput {
    fn open(
        &mut self,
        _constraints: &CaptureConstraints,
        sink: SampleSink,
    ) -> AudioResult<OpenedInput> {
        if let Some(reason) = &self.denied {
            return Err(AudioError::ZugriffVerweigert(reason.clone()));
        }
        let mut state = self.state.lock();
        if state.sink.is_some() {
            return Err(AudioError::StreamFehler("Eingabe bereits geoeffnet".into()));
        }
        state.sink = Some(sink);
        state.opened += 1;
        Ok(OpenedInput {
            sample_rate: self.sample_rate,
            native: self.native.clone(),
        })
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.sink.take().is_some() {
            state.closed += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().sink.is_some()
    }
}

impl MemoryInputFeeder {
    /// Liefert einen Block, gibt false zurueck wenn die Eingabe geschlossen ist
    pub fn push(&self, samples: Vec<f32>) -> bool {
        match &self.state.lock().sink {
            Some(sink) => sink.send(samples).is_ok(),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    pub fn open_count(&self) -> u32 {
        self.state.lock().opened
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().closed
    }
}

// ---------------------------------------------------------------------------
// Uhr
// ---------------------------------------------------------------------------

/// Manuell gestellte Ausgabe-Uhr (Sekunden)
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        *self.now.lock()
    }

    pub fn set(&self, t: f64) {
        *self.now.lock() = t;
    }

    pub fn advance(&self, dt: f64) {
        *self.now.lock() += dt;
    }
}

// ---------------------------------------------------------------------------
// Ausgabe
// ---------------------------------------------------------------------------

/// Aufgezeichneter Puffer eines [`MemoryOutput`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedVoice {
    pub handle: VoiceHandle,
    pub start: f64,
    pub end: f64,
    pub sample_rate: u32,
    pub samples: usize,
    /// Uhrzeit des `stop`-Aufrufs
    pub stopped_at: Option<f64>,
}

impl RecordedVoice {
    /// Ende der tatsaechlich hoerbaren Ausgabe
    pub fn audible_end(&self) -> f64 {
        match self.stopped_at {
            Some(t) => t.min(self.end).max(self.start),
            None => self.end,
        }
    }
}

#[derive(Default)]
struct OutputState {
    voices: Vec<RecordedVoice>,
    next_handle: u64,
    closed: bool,
}

/// Ausgabe-Backend, das geplante Puffer nur aufzeichnet
pub struct MemoryOutput {
    clock: ManualClock,
    sample_rate: u32,
    state: Arc<Mutex<OutputState>>,
}

/// Beobachter-Seite eines [`MemoryOutput`]
#[derive(Clone)]
pub struct MemoryOutputProbe {
    state: Arc<Mutex<OutputState>>,
}

impl MemoryOutput {
    pub fn new(sample_rate: u32, clock: ManualClock) -> (Self, MemoryOutputProbe) {
        let state = Arc::new(Mutex::new(OutputState::default()));
        let output = Self {
            clock,
            sample_rate,
            state: Arc::clone(&state),
        };
        (output, MemoryOutputProbe { state })
    }
}

impl AudioOutput for MemoryOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn start(&mut self, samples: Arc<[f32]>, sample_rate: u32, at: f64) -> AudioResult<VoiceHandle> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(AudioError::Geschlossen);
        }
        state.next_handle += 1;
        let handle = VoiceHandle::new(state.next_handle);
        let start = at.max(self.clock.now());
        state.voices.push(RecordedVoice {
            handle,
            start,
            end: start + samples.len() as f64 / f64::from(sample_rate),
            sample_rate,
            samples: samples.len(),
            stopped_at: None,
        });
        Ok(handle)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if let Some(v) = state.voices.iter_mut().find(|v| v.handle == handle) {
            v.stopped_at.get_or_insert(now);
        }
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}

impl MemoryOutputProbe {
    pub fn voices(&self) -> Vec<RecordedVoice> {
        self.state.lock().voices.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Gibt true zurueck wenn irgendein Puffer nach `t` noch hoerbar ist
    ///
    /// Ein vor seinem Start gestoppter Puffer ist nie hoerbar.
    pub fn audible_after(&self, t: f64) -> bool {
        self.state
            .lock()
            .voices
            .iter()
            .any(|v| v.audible_end() > v.start && v.audible_end() > t)
    }

    /// Gibt true zurueck wenn sich zwei Puffer hoerbar ueberlappen
    ///
    /// Gestoppte Puffer zaehlen nur bis zu ihrem Stopp.
    pub fn has_overlap(&self) -> bool {
        let mut voices = self.voices();
        voices.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut hoerbar_bis = f64::NEG_INFINITY;
        for v in &voices {
            if v.audible_end() <= v.start {
                continue;
            }
            if v.start < hoerbar_bis - 1e-9 {
                return true;
            }
            hoerbar_bis = hoerbar_bis.max(v.audible_end());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn eingabe_exklusiv() {
        let (mut input, feeder) = MemoryInput::new(16_000);
        let (tx, _rx) = mpsc::unbounded_channel();
        input.open(&CaptureConstraints::default(), tx.clone()).unwrap();
        assert!(input.open(&CaptureConstraints::default(), tx).is_err());
        assert_eq!(feeder.open_count(), 1);
    }

    #[test]
    fn ausgabe_zeichnet_auf() {
        let clock = ManualClock::new();
        let (mut out, probe) = MemoryOutput::new(24_000, clock.clone());
        clock.set(1.0);
        let h = out.start(vec![0.0; 2400].into(), 24_000, 1.5).unwrap();
        let v = &probe.voices()[0];
        assert_eq!(v.handle, h);
        assert!((v.start - 1.5).abs() < 1e-9);
        assert!((v.end - 1.6).abs() < 1e-9);

        clock.set(1.55);
        out.stop(h);
        assert!((probe.voices()[0].audible_end() - 1.55).abs() < 1e-9);
        assert!(!probe.audible_after(1.55));
    }

    #[test]
    fn ueberlappung_nach_unterbrechung() {
        let clock = ManualClock::new();
        let (mut out, probe) = MemoryOutput::new(24_000, clock.clone());
        let erster = out.start(vec![0.0; 24_000].into(), 24_000, 0.0).unwrap();
        let spaeter = out.start(vec![0.0; 2_400].into(), 24_000, 1.0).unwrap();
        assert!(!probe.has_overlap());

        // Unterbrechung bei 0.5 s, danach sofort neuer Puffer
        clock.set(0.5);
        out.stop(erster);
        out.stop(spaeter);
        out.start(vec![0.0; 2_400].into(), 24_000, 0.5).unwrap();
        assert!(!probe.has_overlap());

        out.start(vec![0.0; 2_400].into(), 24_000, 0.55).unwrap();
        assert!(probe.has_overlap());
    }

    #[test]
    fn geschlossene_ausgabe_lehnt_ab() {
        let (mut out, probe) = MemoryOutput::new(24_000, ManualClock::new());
        out.close();
        assert!(probe.is_closed());
        assert!(matches!(
            out.start(vec![0.0; 10].into(), 24_000, 0.0),
            Err(AudioError::Geschlossen)
        ));
    }
}
