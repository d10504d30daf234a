//! Playback-Scheduler: lueckenlose, unterbrechbare Wiedergabe
//!
//! Haelt einen einzigen, nur vorwaerts laufenden Cursor ("naechste
//! Startzeit") in der Zeitbasis der Ausgabe-Uhr. Jeder Puffer startet bei
//! `max(jetzt, cursor)`, danach rueckt der Cursor um die Pufferdauer vor.
//! Auch bei stossweiser Ankunft entstehen so weder Luecken noch
//! Ueberlappungen.
//!
//! ## Unterbrechung (Barge-in)
//!
//! `interrupt()` stoppt jeden bekannten Puffer, auch solche, deren Start
//! noch in der Zukunft liegt, und setzt den Cursor auf die aktuelle Zeit.
//! Scheduler und Unterbrechung laufen im selben Task, ein kurz vorher
//! geplanter Puffer ist deshalb immer schon in der Menge und wird mit
//! gestoppt.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{AudioError, AudioResult};

/// Kennung eines geplanten Puffers im Backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Plattform-Backend fuer ein Ausgabegeraet
///
/// Zeiten sind Sekunden in der Uhr des Geraets. Ein gestoppter Puffer darf
/// ab dem `stop`-Aufruf keinen Sample mehr ausgeben.
pub trait AudioOutput: Send {
    /// Abtastrate des Geraets
    fn sample_rate(&self) -> u32;

    /// Aktuelle Zeit der Ausgabe-Uhr
    fn current_time(&self) -> f64;

    /// Plant `samples` (bei `sample_rate`) ab Zeitpunkt `at`
    fn start(&mut self, samples: Arc<[f32]>, sample_rate: u32, at: f64) -> AudioResult<VoiceHandle>;

    /// Stoppt einen Puffer sofort, unbekannte Handles werden ignoriert
    fn stop(&mut self, handle: VoiceHandle);

    /// Gibt das Geraet frei
    fn close(&mut self);
}

/// Zeitfenster eines geplanten Puffers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub handle: VoiceHandle,
    pub start: f64,
    pub end: f64,
}

/// Zaehler des Schedulers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Geplante Puffer insgesamt
    pub scheduled: u64,
    /// Anzahl der Unterbrechungen
    pub interruptions: u64,
    /// Durch Unterbrechung gestoppte Puffer
    pub stopped: u64,
}

/// Scheduler fuer Agenten-Audio, ein Exemplar pro Session
pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    cursor: f64,
    active: BTreeMap<VoiceHandle, ScheduledBuffer>,
    stats: PlaybackStats,
    closed: bool,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        let cursor = output.current_time();
        Self {
            output,
            cursor,
            active: BTreeMap::new(),
            stats: PlaybackStats::default(),
            closed: false,
        }
    }

    /// Plant einen dekodierten Puffer lueckenlos hinter den vorherigen
    ///
    /// Leere Puffer werden uebersprungen (`Ok(None)`).
    pub fn schedule(&mut self, samples: Vec<f32>, sample_rate: u32) -> AudioResult<Option<ScheduledBuffer>> {
        if self.closed {
            return Err(AudioError::Geschlossen);
        }
        if sample_rate == 0 {
            return Err(AudioError::Konfiguration("Abtastrate 0".into()));
        }
        if samples.is_empty() {
            return Ok(None);
        }
        self.reap();

        let now = self.output.current_time();
        let start = now.max(self.cursor);
        let duration = samples.len() as f64 / f64::from(sample_rate);
        let handle = self.output.start(samples.into(), sample_rate, start)?;
        let buffer = ScheduledBuffer {
            handle,
            start,
            end: start + duration,
        };

        self.cursor = buffer.end;
        self.active.insert(handle, buffer);
        self.stats.scheduled += 1;
        trace!(start, ende = buffer.end, aktiv = self.active.len(), "Puffer geplant");
        Ok(Some(buffer))
    }

    /// Stoppt alle geplanten und laufenden Puffer und setzt den Cursor zurueck
    ///
    /// Gibt die Anzahl gestoppter Puffer zurueck.
    pub fn interrupt(&mut self) -> usize {
        let stopped = self.active.len();
        for handle in std::mem::take(&mut self.active).into_keys() {
            self.output.stop(handle);
        }
        self.cursor = self.output.current_time();
        self.stats.interruptions += 1;
        self.stats.stopped += stopped as u64;
        debug!(gestoppt = stopped, "Wiedergabe unterbrochen");
        stopped
    }

    /// Entfernt natuerlich beendete Puffer aus der Menge
    pub fn reap(&mut self) -> usize {
        let now = self.output.current_time();
        let vorher = self.active.len();
        self.active.retain(|_, b| b.end > now);
        vorher - self.active.len()
    }

    /// Gibt true zurueck wenn gerade ein Puffer hoerbar ist
    pub fn is_audible(&self) -> bool {
        let now = self.output.current_time();
        self.active.values().any(|b| b.start <= now && now < b.end)
    }

    /// Verwirft alles und gibt das Ausgabegeraet frei
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        if !self.active.is_empty() {
            self.interrupt();
        }
        self.output.close();
        self.closed = true;
        debug!(geplant = self.stats.scheduled, "Playback beendet");
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn output_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
