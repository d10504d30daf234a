//! Lokales Freizeichen waehrend ein Anruf klingelt
//!
//! Die Anzeige laeuft unabhaengig vom Provider. `stop` muss sofort wirken,
//! auch wenn gerade eine Aufnahme abgerufen wird.

use std::sync::Arc;
use std::time::Duration;

use livevoice_audio::{AudioOutput, RingbackTone, VoiceHandle};
use tracing::{debug, warn};

/// Klingel-Anzeige (Ton, Licht, UI)
pub trait RingIndicator: Send {
    fn start(&mut self);

    fn stop(&mut self);

    fn is_ringing(&self) -> bool;
}

/// Anzeige ohne Ausgabe, nur Zustand und Log
#[derive(Debug, Default)]
pub struct SilentRing {
    ringing: bool,
}

impl RingIndicator for SilentRing {
    fn start(&mut self) {
        self.ringing = true;
        debug!("Klingeln (stumm)");
    }

    fn stop(&mut self) {
        self.ringing = false;
    }

    fn is_ringing(&self) -> bool {
        self.ringing
    }
}

/// Freizeichen ueber ein Ausgabegeraet
///
/// Plant beim Start so viele Perioden, dass `cover` abgedeckt ist. Alle
/// Perioden teilen sich denselben Puffer.
pub struct ToneRing {
    output: Box<dyn AudioOutput>,
    period: Arc<[f32]>,
    cover: Duration,
    voices: Vec<VoiceHandle>,
}

impl ToneRing {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        let rate = output.sample_rate();
        let period: Arc<[f32]> = RingbackTone::new(rate).next_period().into();
        Self {
            output,
            period,
            cover: Duration::from_secs(60),
            voices: Vec::new(),
        }
    }

    /// Maximale Klingeldauer
    pub fn with_cover(mut self, cover: Duration) -> Self {
        self.cover = cover;
        self
    }

    fn period_secs(&self) -> f64 {
        self.period.len() as f64 / f64::from(self.output.sample_rate().max(1))
    }
}

impl RingIndicator for ToneRing {
    fn start(&mut self) {
        if !self.voices.is_empty() {
            return;
        }
        let period = self.period_secs();
        if period <= 0.0 {
            return;
        }
        let perioden = (self.cover.as_secs_f64() / period).ceil().max(1.0) as usize;
        let rate = self.output.sample_rate();
        let start = self.output.current_time();

        for i in 0..perioden {
            let at = start + i as f64 * period;
            match self.output.start(Arc::clone(&self.period), rate, at) {
                Ok(handle) => self.voices.push(handle),
                Err(e) => {
                    warn!("Freizeichen nicht abspielbar: {}", e);
                    break;
                }
            }
        }
        debug!(perioden = self.voices.len(), "Freizeichen gestartet");
    }

    fn stop(&mut self) {
        for handle in self.voices.drain(..) {
            self.output.stop(handle);
        }
    }

    fn is_ringing(&self) -> bool {
        !self.voices.is_empty()
    }
}

impl Drop for ToneRing {
    fn drop(&mut self) {
        self.stop();
        self.output.close();
    }
}
