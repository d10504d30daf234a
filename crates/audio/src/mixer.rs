//! Software-Mixer fuer das cpal-Ausgabegeraet
//!
//! Der cpal-Callback zieht hier Frames ab. Die Uhr ist der Frame-Zaehler des
//! Mixers, Zeiten in Sekunden entsprechen also exakt gerenderten Samples.
//! Jede Stimme traegt ihre Quellrate und wird per linearer Interpolation
//! auf die Geraeterate gebracht.

use std::sync::Arc;

use crate::playback::VoiceHandle;

struct MixVoice {
    handle: VoiceHandle,
    samples: Arc<[f32]>,
    /// Quell-Samples pro Geraete-Frame
    step: f64,
    start_frame: u64,
}

impl MixVoice {
    fn end_frame(&self) -> u64 {
        self.start_frame + (self.samples.len() as f64 / self.step).ceil() as u64
    }

    fn sample_at(&self, frame: u64) -> f32 {
        if frame < self.start_frame {
            return 0.0;
        }
        let pos = (frame - self.start_frame) as f64 * self.step;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        match (self.samples.get(idx), self.samples.get(idx + 1)) {
            (Some(a), Some(b)) => a + (b - a) * frac,
            (Some(a), None) => *a,
            _ => 0.0,
        }
    }
}

/// Mischt geplante Stimmen in den Ausgabepuffer
pub struct Mixer {
    device_rate: u32,
    channels: u16,
    frames_rendered: u64,
    voices: Vec<MixVoice>,
    next_handle: u64,
}

impl Mixer {
    pub fn new(device_rate: u32, channels: u16) -> Self {
        Self {
            device_rate: device_rate.max(1),
            channels: channels.max(1),
            frames_rendered: 0,
            voices: Vec::new(),
            next_handle: 0,
        }
    }

    /// Aktuelle Zeit in Sekunden (gerenderte Frames / Rate)
    pub fn time(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.device_rate)
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    /// Fuegt eine Stimme hinzu, die ab `at` Sekunden spielt
    ///
    /// Startzeiten in der Vergangenheit beginnen mit dem naechsten Frame.
    pub fn add(&mut self, samples: Arc<[f32]>, sample_rate: u32, at: f64) -> VoiceHandle {
        self.next_handle += 1;
        let handle = VoiceHandle::new(self.next_handle);
        let start_frame = ((at.max(0.0) * f64::from(self.device_rate)).round() as u64)
            .max(self.frames_rendered);
        self.voices.push(MixVoice {
            handle,
            samples,
            step: f64::from(sample_rate.max(1)) / f64::from(self.device_rate),
            start_frame,
        });
        handle
    }

    /// Entfernt eine Stimme, gibt false zurueck wenn sie schon weg war
    pub fn remove(&mut self, handle: VoiceHandle) -> bool {
        let vorher = self.voices.len();
        self.voices.retain(|v| v.handle != handle);
        self.voices.len() != vorher
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn active(&self) -> usize {
        self.voices.len()
    }

    /// Rendert interleaved Frames in `out` und rueckt die Uhr vor
    pub fn render(&mut self, out: &mut [f32]) {
        let channels = usize::from(self.channels);
        let frames = out.len() / channels;

        for (f, frame) in out.chunks_exact_mut(channels).enumerate() {
            let t = self.frames_rendered + f as u64;
            let mixed: f32 = self.voices.iter().map(|v| v.sample_at(t)).sum();
            frame.fill(mixed.clamp(-1.0, 1.0));
        }

        self.frames_rendered += frames as u64;
        let now = self.frames_rendered;
        self.voices.retain(|v| v.end_frame() > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uhr_folgt_gerenderten_frames() {
        let mut mixer = Mixer::new(48_000, 2);
        let mut buf = vec![0.0f32; 960];
        mixer.render(&mut buf);
        assert!((mixer.time() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn stimme_startet_zum_geplanten_frame() {
        let mut mixer = Mixer::new(1000, 1);
        mixer.add(vec![0.5; 10].into(), 1000, 0.005);
        let mut buf = vec![0.0f32; 20];
        mixer.render(&mut buf);
        assert!(buf[..5].iter().all(|s| *s == 0.0));
        assert!(buf[5..15].iter().all(|s| (*s - 0.5).abs() < 1e-6));
        assert!(buf[15..].iter().all(|s| *s == 0.0));
        assert_eq!(mixer.active(), 0, "beendete Stimme wird entfernt");
    }

    #[test]
    fn gestoppte_stimme_verstummt() {
        let mut mixer = Mixer::new(1000, 1);
        let h = mixer.add(vec![0.5; 100].into(), 1000, 0.0);
        let mut buf = vec![0.0f32; 10];
        mixer.render(&mut buf);
        assert!(mixer.remove(h));
        mixer.render(&mut buf);
        assert!(buf.iter().all(|s| *s == 0.0));
        assert!(!mixer.remove(h));
    }

    #[test]
    fn resampling_verdoppelt_dauer() {
        // 24 kHz Quelle auf 48 kHz Geraet: doppelt so viele Frames
        let mut mixer = Mixer::new(48_000, 1);
        mixer.add(vec![0.25; 240].into(), 24_000, 0.0);
        let mut buf = vec![0.0f32; 480];
        mixer.render(&mut buf);
        assert!(buf.iter().all(|s| (*s - 0.25).abs() < 1e-6));
        assert_eq!(mixer.active(), 0);
    }

    #[test]
    fn summe_wird_begrenzt_und_auf_kanaele_verteilt() {
        let mut mixer = Mixer::new(1000, 2);
        mixer.add(vec![0.8; 4].into(), 1000, 0.0);
        mixer.add(vec![0.8; 4].into(), 1000, 0.0);
        let mut buf = vec![0.0f32; 8];
        mixer.render(&mut buf);
        assert!(buf.iter().all(|s| (*s - 1.0).abs() < 1e-6));
    }
}
