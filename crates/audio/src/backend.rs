//! cpal-Backends fuer Mikrofon und Lautsprecher
//!
//! cpal-Streams sind nicht `Send`. Jeder Stream lebt deshalb auf einem
//! eigenen Thread, der ihn baut, startet und bis zum Shutdown-Signal haelt.
//! Das Ergebnis des Oeffnens kommt ueber einen Bereitschaftskanal zurueck,
//! `close()` sendet das Shutdown-Signal und wartet auf den Thread. Danach
//! ist das Geraet freigegeben.

use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, Stream};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::capture::{AudioInput, CaptureConstraints, OpenedInput, SampleSink};
use crate::device::{resolve_device, DeviceDirection};
use crate::error::{AudioError, AudioResult};
use crate::mixer::Mixer;
use crate::playback::{AudioOutput, VoiceHandle};

// ---------------------------------------------------------------------------
// Stream-Thread
// ---------------------------------------------------------------------------

struct StreamWorker {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl StreamWorker {
    /// Startet `build` auf einem eigenen Thread und wartet auf dessen Ergebnis
    fn spawn<T, F>(name: &str, build: F) -> AudioResult<(Self, T)>
    where
        T: Send + 'static,
        F: FnOnce() -> AudioResult<(Stream, T)> + Send + 'static,
    {
        let (ready_tx, ready_rx) = bounded::<AudioResult<T>>(1);
        let (shutdown_tx, shutdown_rx): (Sender<()>, Receiver<()>) = bounded(1);

        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match build() {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Haelt den Stream bis close() oder bis der Sender weg ist
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(info)) => Ok((
                Self {
                    shutdown: shutdown_tx,
                    thread,
                },
                info,
            )),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::StreamFehler(
                    "Audio-Thread vorzeitig beendet".into(),
                ))
            }
        }
    }

    fn stop(self) {
        let _ = self.shutdown.send(());
        if self.thread.join().is_err() {
            warn!("Audio-Thread ist beim Beenden abgestuerzt");
        }
    }
}

fn map_build_error(e: BuildStreamError) -> AudioError {
    match e {
        BuildStreamError::DeviceNotAvailable => {
            AudioError::GeraetNichtGefunden("Geraet nicht mehr verfuegbar".into())
        }
        BuildStreamError::BackendSpecific { err } => {
            let text = err.to_string();
            let lower = text.to_lowercase();
            if lower.contains("permission") || lower.contains("denied") {
                AudioError::ZugriffVerweigert(text)
            } else {
                AudioError::StreamFehler(text)
            }
        }
        other => AudioError::StreamFehler(other.to_string()),
    }
}

/// Mischt interleaved Frames zu Mono
fn downmix<T: Copy>(data: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    data.chunks(channels.max(1))
        .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() / frame.len() as f32)
        .collect()
}

// ---------------------------------------------------------------------------
// Eingabe
// ---------------------------------------------------------------------------

/// Mikrofon ueber cpal
///
/// cpal kennt keine Aufnahme-Hinweise, alle gewuenschten Hinweise werden
/// von der Pipeline in Software umgesetzt.
pub struct CpalInput {
    device_name: Option<String>,
    worker: Option<StreamWorker>,
}

impl CpalInput {
    /// `device_name` waehlt per Teilstring, `None` nimmt das Standardgeraet
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            worker: None,
        }
    }
}

fn build_input(device_name: Option<&str>, sink: SampleSink) -> AudioResult<(Stream, u32)> {
    let device = resolve_device(DeviceDirection::Input, device_name)?;
    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    let rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels());
    let config = supported.config();
    let err_fn = |err| error!("Capture-Fehler: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = sink.send(downmix(data, channels, |s| s));
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = sink.send(downmix(data, channels, |s| f32::from(s) / 32768.0));
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let _ = sink.send(downmix(data, channels, |s| {
                    (f32::from(s) - 32768.0) / 32768.0
                }));
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {other:?}"
            )))
        }
    }
    .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    debug!("Capture-Stream geoeffnet: {}Hz {}ch", rate, channels);
    Ok((stream, rate))
}

impl AudioInput for CpalInput {
    fn open(
        &mut self,
        constraints: &CaptureConstraints,
        sink: SampleSink,
    ) -> AudioResult<OpenedInput> {
        if self.worker.is_some() {
            return Err(AudioError::StreamFehler("Eingabe bereits geoeffnet".into()));
        }
        let name = self.device_name.clone();
        let (worker, rate) =
            StreamWorker::spawn("livevoice-capture", move || build_input(name.as_deref(), sink))?;
        self.worker = Some(worker);

        if constraints.channel_count > 1 {
            debug!(
                kanaele = constraints.channel_count,
                "Mehrkanal angefordert, Pipeline mischt zu Mono"
            );
        }
        Ok(OpenedInput {
            sample_rate: rate,
            native: CaptureConstraints::none(),
        })
    }

    fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
            debug!("Capture-Geraet freigegeben");
        }
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Ausgabe
// ---------------------------------------------------------------------------

/// Lautsprecher ueber cpal, gespeist aus einem [`Mixer`]
pub struct CpalOutput {
    mixer: Arc<Mutex<Mixer>>,
    device_rate: u32,
    worker: Option<StreamWorker>,
}

fn build_output(device_name: Option<&str>, mixer: Arc<Mutex<Mixer>>) -> AudioResult<(Stream, u32)> {
    let device = resolve_device(DeviceDirection::Output, device_name)?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    let rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config = supported.config();
    *mixer.lock() = Mixer::new(rate, channels);
    let err_fn = |err| error!("Wiedergabe-Fehler: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mixer.lock().render(data);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0f32);
                    mixer.lock().render(&mut scratch);
                    for (out, s) in data.iter_mut().zip(&scratch) {
                        *out = (s * 32767.0) as i16;
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {other:?}"
            )))
        }
    }
    .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    debug!("Wiedergabe-Stream geoeffnet: {}Hz {}ch", rate, channels);
    Ok((stream, rate))
}

impl CpalOutput {
    /// Oeffnet das Ausgabegeraet und startet den Mixer
    pub fn open(device_name: Option<String>) -> AudioResult<Self> {
        let mixer = Arc::new(Mutex::new(Mixer::new(48_000, 2)));
        let shared = Arc::clone(&mixer);
        let (worker, device_rate) = StreamWorker::spawn("livevoice-playback", move || {
            build_output(device_name.as_deref(), shared)
        })?;
        info!(rate = device_rate, "Ausgabegeraet geoeffnet");
        Ok(Self {
            mixer,
            device_rate,
            worker: Some(worker),
        })
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.device_rate
    }

    fn current_time(&self) -> f64 {
        self.mixer.lock().time()
    }

    fn start(&mut self, samples: Arc<[f32]>, sample_rate: u32, at: f64) -> AudioResult<VoiceHandle> {
        if self.worker.is_none() {
            return Err(AudioError::Geschlossen);
        }
        Ok(self.mixer.lock().add(samples, sample_rate, at))
    }

    fn stop(&mut self, handle: VoiceHandle) {
        self.mixer.lock().remove(handle);
    }

    fn close(&mut self) {
        self.mixer.lock().clear();
        if let Some(worker) = self.worker.take() {
            worker.stop();
            debug!("Ausgabegeraet freigegeben");
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}
