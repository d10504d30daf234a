//! Freizeichen-Generator (440 Hz + 480 Hz, 2 s an / 4 s aus)

use std::f32::consts::TAU;
use std::time::Duration;

/// Dauer des Tons pro Periode
pub const RINGBACK_ON: Duration = Duration::from_secs(2);
/// Pause pro Periode
pub const RINGBACK_OFF: Duration = Duration::from_secs(4);

const FREQ_LOW: f32 = 440.0;
const FREQ_HIGH: f32 = 480.0;
/// Amplitude je Teilton, die Summe bleibt unter 0.3
const AMPLITUDE: f32 = 0.15;
/// Ein-/Ausblenden gegen Knackser
const FADE_SECS: f32 = 0.01;

/// Endloser Freizeichen-Generator mit fortlaufender Phase
#[derive(Debug, Clone)]
pub struct RingbackTone {
    sample_rate: u32,
    position: u64,
}

impl RingbackTone {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            position: 0,
        }
    }

    /// Samples pro Periode (an + aus)
    pub fn period_samples(&self) -> u64 {
        let rate = u64::from(self.sample_rate);
        (RINGBACK_ON + RINGBACK_OFF).as_secs() * rate
    }

    fn on_samples(&self) -> u64 {
        RINGBACK_ON.as_secs() * u64::from(self.sample_rate)
    }

    /// Fuellt `out` mit den naechsten Samples
    pub fn fill(&mut self, out: &mut [f32]) {
        let rate = self.sample_rate as f32;
        let on = self.on_samples();
        let period = self.period_samples();
        let fade = (FADE_SECS * rate) as u64;

        for sample in out.iter_mut() {
            let in_period = self.position % period;
            *sample = if in_period < on {
                let t = self.position as f32 / rate;
                let tone = (TAU * FREQ_LOW * t).sin() + (TAU * FREQ_HIGH * t).sin();
                let edge = in_period.min(on - 1 - in_period);
                let gain = if fade > 0 && edge < fade {
                    edge as f32 / fade as f32
                } else {
                    1.0
                };
                tone * AMPLITUDE * gain
            } else {
                0.0
            };
            self.position += 1;
        }
    }

    /// Genau eine Periode ab dem aktuellen Stand
    pub fn next_period(&mut self) -> Vec<f32> {
        let mut buf = vec![0.0; self.period_samples() as usize];
        self.fill(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::rms;

    #[test]
    fn periode_hat_ton_und_pause() {
        let mut tone = RingbackTone::new(8_000);
        let period = tone.next_period();
        assert_eq!(period.len(), 48_000);

        let an = &period[..16_000];
        let aus = &period[16_000..];
        assert!(rms(an) > 0.05, "Ton hoerbar");
        assert!(aus.iter().all(|s| *s == 0.0), "Pause still");
    }

    #[test]
    fn pegel_bleibt_begrenzt() {
        let mut tone = RingbackTone::new(48_000);
        let mut buf = vec![0.0; 48_000];
        tone.fill(&mut buf);
        assert!(buf.iter().all(|s| s.abs() <= 2.0 * AMPLITUDE + 1e-6));
    }

    #[test]
    fn einblenden_ohne_sprung() {
        let mut tone = RingbackTone::new(48_000);
        let mut buf = vec![0.0; 10];
        tone.fill(&mut buf);
        assert_eq!(buf[0], 0.0);
        assert!(buf.iter().all(|s| s.abs() < 0.01));
    }

    #[test]
    fn zweite_periode_setzt_fort() {
        let mut tone = RingbackTone::new(8_000);
        tone.next_period();
        let zweite = tone.next_period();
        assert!(rms(&zweite[..16_000]) > 0.05);
    }
}
