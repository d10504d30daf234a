//! Software-Aufbereitung des Mikrofonsignals
//!
//! Backends melden beim Oeffnen, welche Capture-Hinweise (Echo-Unterdrueckung,
//! Rauschunterdrueckung, Pegelautomatik) sie selbst umsetzen. Fuer alle
//! uebrigen baut die Capture-Pipeline hier eine Prozessor-Kette.
//!
//! Reihenfolge: NoiseFloorSuppressor -> GainNormalizer -> EchoDucker
//!
//! Bloecke, die der NoiseFloorSuppressor als Rauschen einstuft, markiert er im
//! [`BlockContext`]. Der GainNormalizer haelt darauf seinen Gain, sonst wuerde
//! er das eben abgesenkte Rauschen wieder anheben.
//!
//! Alle Prozessoren arbeiten blockweise in-place. Gain-Aenderungen werden
//! linear ueber den Block gerampt, damit an Blockgrenzen keine Knackser
//! entstehen.

use crate::capture::CaptureConstraints;
use crate::codec::rms;

/// Zustand, den ein Prozessor pro Block sieht
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockContext {
    /// Abtastrate des Blocks
    pub sample_rate: u32,
    /// Ob gerade Agenten-Audio hoerbar ist (Referenz fuer Echo-Unterdrueckung)
    pub far_end_active: bool,
    /// Von einer frueheren Stufe der Kette als Rauschen eingestuft
    pub noise: bool,
}

/// Gemeinsames Trait fuer alle Aufbereitungs-Stufen
pub trait SignalProcessor: Send {
    /// Verarbeitet einen Block in-place, darf Einstufungen im Kontext setzen
    fn process(&mut self, block: &mut [f32], ctx: &mut BlockContext);

    /// Setzt den internen Zustand zurueck
    fn reset(&mut self);

    /// Name fuer Logs
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Rauschunterdrueckung
// ---------------------------------------------------------------------------

/// Rauschunterdrueckung ueber einen adaptiven Grundrausch-Pegel
///
/// Der Pegel folgt leisen Bloecken schnell nach unten und lauten nur
/// langsam nach oben. Bloecke nahe am Grundrauschen werden abgesenkt.
pub struct NoiseFloorSuppressor {
    floor: f32,
    gain: f32,
    /// Bloecke unter `floor * open_ratio` gelten als Rauschen
    open_ratio: f32,
    /// Gain fuer Rausch-Bloecke
    attenuation: f32,
    /// Anstieg des Grundrauschens pro Block (0..1)
    rise: f32,
}

impl NoiseFloorSuppressor {
    pub fn new() -> Self {
        Self {
            floor: 0.0,
            gain: 1.0,
            open_ratio: 2.0,
            attenuation: 0.2,
            rise: 0.02,
        }
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }
}

impl Default for NoiseFloorSuppressor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for NoiseFloorSuppressor {
    fn process(&mut self, block: &mut [f32], ctx: &mut BlockContext) {
        if block.is_empty() {
            return;
        }
        let level = rms(block);
        if self.floor == 0.0 || level < self.floor {
            self.floor = level;
        } else {
            self.floor += (level - self.floor) * self.rise;
        }

        let target = if level <= self.floor * self.open_ratio {
            self.attenuation
        } else {
            1.0
        };
        ctx.noise = target < 1.0;
        apply_ramp(block, self.gain, target);
        self.gain = target;
    }

    fn reset(&mut self) {
        self.floor = 0.0;
        self.gain = 1.0;
    }

    fn name(&self) -> &'static str {
        "noise_suppression"
    }
}

// ---------------------------------------------------------------------------
// Pegelautomatik
// ---------------------------------------------------------------------------

/// Blockweise Pegelautomatik mit Limiter
///
/// Auf Stille und auf als Rauschen markierten Bloecken bleibt der Gain stehen.
pub struct GainNormalizer {
    /// Ziel-RMS (0.1 entspricht etwa -20 dBFS)
    target_level: f32,
    min_gain: f32,
    max_gain: f32,
    /// Anteil der Gain-Differenz, der pro Block nachgezogen wird
    smoothing: f32,
    limiter: f32,
    /// Unterhalb dieses Pegels bleibt der Gain stehen
    silence: f32,
    gain: f32,
}

impl GainNormalizer {
    pub fn new() -> Self {
        Self {
            target_level: 0.1,
            min_gain: 0.25,
            max_gain: 10.0,
            smoothing: 0.3,
            limiter: 0.95,
            silence: 1e-4,
            gain: 1.0,
        }
    }

    pub fn current_gain(&self) -> f32 {
        self.gain
    }
}

impl Default for GainNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for GainNormalizer {
    fn process(&mut self, block: &mut [f32], ctx: &mut BlockContext) {
        if block.is_empty() {
            return;
        }
        let level = rms(block);
        let previous = self.gain;
        if level > self.silence && !ctx.noise {
            let desired = (self.target_level / level).clamp(self.min_gain, self.max_gain);
            self.gain += (desired - self.gain) * self.smoothing;
        }
        apply_ramp(block, previous, self.gain);
        for s in block.iter_mut() {
            *s = s.clamp(-self.limiter, self.limiter);
        }
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }

    fn name(&self) -> &'static str {
        "auto_gain_control"
    }
}

// ---------------------------------------------------------------------------
// Echo-Unterdrueckung
// ---------------------------------------------------------------------------

/// Halbduplex-Echo-Unterdrueckung
///
/// Ohne Zugriff auf das Lautsprechersignal im Geraet wird das Mikrofon
/// abgesenkt, solange Agenten-Audio hoerbar ist.
pub struct EchoDucker {
    attenuation: f32,
    gain: f32,
}

impl EchoDucker {
    pub fn new(attenuation: f32) -> Self {
        Self {
            attenuation: attenuation.clamp(0.0, 1.0),
            gain: 1.0,
        }
    }
}

impl Default for EchoDucker {
    fn default() -> Self {
        Self::new(0.15)
    }
}

impl SignalProcessor for EchoDucker {
    fn process(&mut self, block: &mut [f32], ctx: &mut BlockContext) {
        let target = if ctx.far_end_active {
            self.attenuation
        } else {
            1.0
        };
        apply_ramp(block, self.gain, target);
        self.gain = target;
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }

    fn name(&self) -> &'static str {
        "echo_cancellation"
    }
}

// ---------------------------------------------------------------------------
// Kette
// ---------------------------------------------------------------------------

/// Kette von Aufbereitungs-Stufen
pub struct ConditioningChain {
    processors: Vec<Box<dyn SignalProcessor>>,
}

impl ConditioningChain {
    pub fn new(processors: Vec<Box<dyn SignalProcessor>>) -> Self {
        Self { processors }
    }

    /// Leere Kette ohne Prozessoren
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Baut die Kette fuer die Hinweise, die in Software umgesetzt werden
    pub fn for_constraints(software: &CaptureConstraints) -> Self {
        let mut processors: Vec<Box<dyn SignalProcessor>> = Vec::new();
        if software.noise_suppression {
            processors.push(Box::new(NoiseFloorSuppressor::new()));
        }
        if software.auto_gain_control {
            processors.push(Box::new(GainNormalizer::new()));
        }
        if software.echo_cancellation {
            processors.push(Box::new(EchoDucker::default()));
        }
        Self::new(processors)
    }

    /// Verarbeitet einen Block durch alle Stufen
    pub fn process(&mut self, block: &mut [f32], ctx: &BlockContext) {
        let mut ctx = BlockContext {
            noise: false,
            ..*ctx
        };
        for p in self.processors.iter_mut() {
            p.process(block, &mut ctx);
        }
    }

    /// Setzt alle Stufen zurueck
    pub fn reset_all(&mut self) {
        for p in self.processors.iter_mut() {
            p.reset();
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

// Linearer Gain-Verlauf von `from` nach `to` ueber den Block
fn apply_ramp(block: &mut [f32], from: f32, to: f32) {
    if block.is_empty() {
        return;
    }
    if (from - to).abs() < f32::EPSILON {
        if (to - 1.0).abs() >= f32::EPSILON {
            block.iter_mut().for_each(|s| *s *= to);
        }
        return;
    }
    let step = (to - from) / block.len() as f32;
    for (i, s) in block.iter_mut().enumerate() {
        *s *= from + step * (i + 1) as f32;
    }
}
