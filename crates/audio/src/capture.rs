//! Capture-Pipeline: Mikrofon -> Chunks -> Leitungsformat
//!
//! Das Backend ([`AudioInput`]) liefert Bloecke beliebiger Groesse in einen
//! tokio-Kanal. Die Pipeline sammelt sie zu Chunks fester Groesse und
//! verarbeitet jeden Chunk:
//!
//! 1. RMS-Pegel messen (fuer die Pegelanzeige)
//! 2. Software-Aufbereitung fuer nicht nativ erfuellte Hinweise
//! 3. Downsampling auf die Leitungsrate
//! 4. Kodierung als PCM16
//!
//! Eine Pipeline gehoert genau einer Session. `stop()` (oder Drop) schliesst
//! das Geraet sofort.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::codec::{downsample, encode_pcm16, rms};
use crate::conditioning::{BlockContext, ConditioningChain};
use crate::error::{AudioError, AudioResult};
use crate::frame::{AudioFrame, FrameDirection, FramePayload};

/// Standard-Chunkgroesse in Samples (Geraeterate)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Standard-Leitungsrate fuer Mikrofon-Audio
pub const DEFAULT_WIRE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// Backend-Schnittstelle
// ---------------------------------------------------------------------------

/// Hinweise an das Eingabegeraet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Angeforderte Kanalanzahl, die Pipeline verarbeitet Mono
    pub channel_count: u16,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            channel_count: 1,
        }
    }
}

impl CaptureConstraints {
    /// Keine Aufbereitung
    pub fn none() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            channel_count: 1,
        }
    }

    /// Hinweise, die nach den nativ erfuellten noch offen sind
    pub fn remaining(&self, native: &CaptureConstraints) -> CaptureConstraints {
        CaptureConstraints {
            echo_cancellation: self.echo_cancellation && !native.echo_cancellation,
            noise_suppression: self.noise_suppression && !native.noise_suppression,
            auto_gain_control: self.auto_gain_control && !native.auto_gain_control,
            channel_count: self.channel_count,
        }
    }
}

/// Ergebnis von [`AudioInput::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedInput {
    /// Native Abtastrate der gelieferten Bloecke
    pub sample_rate: u32,
    /// Vom Backend selbst umgesetzte Hinweise
    pub native: CaptureConstraints,
}

/// Senke fuer Mono-Bloecke aus dem Backend
pub type SampleSink = mpsc::UnboundedSender<Vec<f32>>;

/// Plattform-Backend fuer ein Eingabegeraet
///
/// `open` belegt das Geraet exklusiv und liefert Mono-f32-Bloecke in `sink`.
/// Nach `close` darf das Backend keine Bloecke mehr liefern und muss das
/// Geraet freigegeben haben.
pub trait AudioInput: Send {
    fn open(&mut self, constraints: &CaptureConstraints, sink: SampleSink)
        -> AudioResult<OpenedInput>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Konfiguration der Capture-Pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Chunkgroesse in Samples bei Geraeterate
    pub chunk_size: usize,
    /// Zielrate auf der Leitung
    pub wire_rate: u32,
    pub constraints: CaptureConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            wire_rate: DEFAULT_WIRE_RATE,
            constraints: CaptureConstraints::default(),
        }
    }
}

/// Ein fertig verarbeiteter Chunk
#[derive(Debug, Clone)]
pub struct CapturedChunk {
    /// PCM16 bei Leitungsrate
    pub frame: AudioFrame,
    /// RMS-Pegel des Roh-Signals
    pub level: f32,
}

/// Capture-Pipeline einer Session
pub struct CapturePipeline {
    input: Box<dyn AudioInput>,
    config: CaptureConfig,
    chain: ConditioningChain,
    rx: Option<mpsc::UnboundedReceiver<Vec<f32>>>,
    native_rate: u32,
    pending: Vec<f32>,
    far_end_active: bool,
    chunks: u64,
}

impl CapturePipeline {
    pub fn new(input: Box<dyn AudioInput>, config: CaptureConfig) -> Self {
        Self {
            input,
            chain: ConditioningChain::empty(),
            rx: None,
            native_rate: 0,
            pending: Vec::with_capacity(config.chunk_size * 2),
            far_end_active: false,
            chunks: 0,
            config,
        }
    }

    /// Oeffnet das Eingabegeraet
    ///
    /// Fehler (kein Geraet, Zugriff verweigert) werden unveraendert
    /// zurueckgegeben, der Aufrufer bildet sie auf `CaptureUnavailable` ab.
    pub fn start(&mut self) -> AudioResult<()> {
        if self.rx.is_some() {
            return Ok(());
        }
        if self.config.chunk_size == 0 {
            return Err(AudioError::Konfiguration("Chunkgroesse 0".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let opened = self.input.open(&self.config.constraints, tx)?;

        if opened.sample_rate < self.config.wire_rate {
            self.input.close();
            return Err(AudioError::Konfiguration(format!(
                "Geraeterate {} Hz unter Leitungsrate {} Hz",
                opened.sample_rate, self.config.wire_rate
            )));
        }

        let software = self.config.constraints.remaining(&opened.native);
        self.chain = ConditioningChain::for_constraints(&software);
        self.native_rate = opened.sample_rate;
        self.rx = Some(rx);
        self.pending.clear();

        info!(
            rate = opened.sample_rate,
            chunk = self.config.chunk_size,
            aufbereitung = ?self.chain.names(),
            "Capture gestartet"
        );
        Ok(())
    }

    /// Wartet auf den naechsten vollstaendigen Chunk
    ///
    /// `Ok(None)` bedeutet: das Backend liefert nichts mehr oder die
    /// Pipeline laeuft nicht. Abbruch-sicher, es gehen keine Samples
    /// verloren, wenn der Future vor dem Abschluss fallengelassen wird.
    pub async fn next_chunk(&mut self) -> AudioResult<Option<CapturedChunk>> {
        loop {
            if self.pending.len() >= self.config.chunk_size {
                let mut window: Vec<f32> = self.pending.drain(..self.config.chunk_size).collect();
                return self.process_window(&mut window).map(Some);
            }
            let Some(rx) = self.rx.as_mut() else {
                return Ok(None);
            };
            match rx.recv().await {
                Some(block) => self.pending.extend_from_slice(&block),
                None => {
                    debug!("Capture-Backend liefert keine Bloecke mehr");
                    return Ok(None);
                }
            }
        }
    }

    /// Verarbeitet ein Fenster bei Geraeterate zu einem Chunk
    pub fn process_window(&mut self, window: &mut [f32]) -> AudioResult<CapturedChunk> {
        let level = rms(window);
        let ctx = BlockContext {
            sample_rate: self.native_rate,
            far_end_active: self.far_end_active,
            noise: false,
        };
        self.chain.process(window, &ctx);

        let resampled = downsample(window, self.native_rate, self.config.wire_rate)?;
        let pcm = encode_pcm16(&resampled);
        self.chunks += 1;

        Ok(CapturedChunk {
            frame: AudioFrame::new(
                FrameDirection::Capture,
                self.config.wire_rate,
                FramePayload::Pcm16(Bytes::from(pcm)),
            ),
            level,
        })
    }

    /// Meldet, ob Agenten-Audio gerade hoerbar ist (fuer die Echo-Unterdrueckung)
    pub fn set_far_end_active(&mut self, active: bool) {
        self.far_end_active = active;
    }

    /// Schliesst das Geraet und verwirft gepufferte Samples
    pub fn stop(&mut self) {
        if self.rx.take().is_some() || self.input.is_open() {
            self.input.close();
            info!(chunks = self.chunks, "Capture gestoppt");
        }
        self.pending.clear();
        self.chain.reset_all();
    }

    pub fn is_running(&self) -> bool {
        self.rx.is_some()
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Anzahl verarbeiteter Chunks seit Erstellung
    pub fn chunks(&self) -> u64 {
        self.chunks
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_pcm16;
    use crate::memory::MemoryInput;

    fn roh_config(chunk: usize) -> CaptureConfig {
        CaptureConfig {
            chunk_size: chunk,
            wire_rate: 16_000,
            constraints: CaptureConstraints::none(),
        }
    }

    #[test]
    fn capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.wire_rate, 16_000);
        assert!(config.constraints.echo_cancellation);
    }

    #[test]
    fn offene_hinweise_ohne_native() {
        let gewuenscht = CaptureConstraints::default();
        let native = CaptureConstraints {
            echo_cancellation: true,
            ..CaptureConstraints::none()
        };
        let rest = gewuenscht.remaining(&native);
        assert!(!rest.echo_cancellation);
        assert!(rest.noise_suppression);
        assert!(rest.auto_gain_control);
    }

    #[tokio::test]
    async fn bloecke_werden_zu_chunks() {
        let (input, feeder) = MemoryInput::new(48_000);
        let mut pipeline = CapturePipeline::new(Box::new(input), roh_config(480));
        pipeline.start().unwrap();

        // Zwei ungleich grosse Bloecke ergeben genau einen Chunk mit Rest
        feeder.push(vec![0.5; 300]);
        feeder.push(vec![0.5; 300]);

        let chunk = pipeline.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.frame.sample_rate(), 16_000);
        assert_eq!(chunk.frame.direction(), FrameDirection::Capture);
        assert_eq!(chunk.frame.sample_count(), Some(160));
        assert!((chunk.level - 0.5).abs() < 1e-6);

        let pcm = chunk.frame.to_pcm16().unwrap();
        let samples = decode_pcm16(&pcm);
        assert!(samples.iter().all(|s| (s - 0.5).abs() < 1e-3));
        assert_eq!(pipeline.chunks(), 1);
    }

    #[tokio::test]
    async fn geraet_verweigert_ist_fehler() {
        let input = MemoryInput::denied("Berechtigung abgelehnt");
        let mut pipeline = CapturePipeline::new(Box::new(input), roh_config(480));
        let err = pipeline.start().unwrap_err();
        assert!(matches!(err, AudioError::ZugriffVerweigert(_)));
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn zu_niedrige_geraeterate_abgelehnt() {
        let (input, feeder) = MemoryInput::new(8_000);
        let mut pipeline = CapturePipeline::new(Box::new(input), roh_config(480));
        assert!(matches!(
            pipeline.start(),
            Err(AudioError::Konfiguration(_))
        ));
        assert!(!feeder.is_open(), "Geraet muss wieder geschlossen sein");
    }

    #[tokio::test]
    async fn stop_gibt_geraet_frei() {
        let (input, feeder) = MemoryInput::new(16_000);
        let mut pipeline = CapturePipeline::new(Box::new(input), roh_config(160));
        pipeline.start().unwrap();
        assert!(feeder.is_open());

        pipeline.stop();
        assert!(!feeder.is_open());
        assert_eq!(feeder.close_count(), 1);
        assert!(!feeder.push(vec![0.1; 160]), "Nach stop darf nichts mehr ankommen");
        assert!(pipeline.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn drop_gibt_geraet_frei() {
        let (input, feeder) = MemoryInput::new(16_000);
        {
            let mut pipeline = CapturePipeline::new(Box::new(input), roh_config(160));
            pipeline.start().unwrap();
        }
        assert!(!feeder.is_open());
    }

    #[tokio::test]
    async fn software_aufbereitung_fuer_offene_hinweise() {
        let (input, _feeder) = MemoryInput::new(48_000);
        let config = CaptureConfig {
            chunk_size: 480,
            ..CaptureConfig::default()
        };
        let mut pipeline = CapturePipeline::new(Box::new(input), config);
        pipeline.start().unwrap();

        // Echo-Unterdrueckung senkt ab, solange der Agent spricht
        pipeline.set_far_end_active(true);
        let mut laut = vec![0.3f32; 480];
        let chunk = pipeline.process_window(&mut laut).unwrap();
        assert!((chunk.level - 0.3).abs() < 1e-6, "Pegel misst das Roh-Signal");
        let samples = decode_pcm16(&chunk.frame.to_pcm16().unwrap());
        assert!(samples.last().unwrap().abs() < 0.3);
    }
}
