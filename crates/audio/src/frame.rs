//! Audio-Frames zwischen Pipeline-Stufen
//!
//! Ein Frame ist nach dem Erstellen unveraenderlich. Die Payload liegt in
//! `Arc<[f32]>` bzw. `Bytes`, Weitergabe an die naechste Stufe kopiert
//! also keine Samples.

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{decode_pcm16, encode_pcm16};

/// Richtung eines Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// Mikrofon -> Agent
    Capture,
    /// Agent -> Lautsprecher
    Playback,
}

/// Kodierung der Payload
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// Rohe Geraete-Samples
    Float(Arc<[f32]>),
    /// 16-bit PCM, little-endian
    Pcm16(Bytes),
    /// Transport-kodiert (base64-Text wie auf der Leitung)
    Transport(Arc<str>),
}

/// Ein Audio-Puffer fester Dauer
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    direction: FrameDirection,
    sample_rate: u32,
    payload: FramePayload,
}

impl AudioFrame {
    pub fn new(direction: FrameDirection, sample_rate: u32, payload: FramePayload) -> Self {
        Self {
            direction,
            sample_rate,
            payload,
        }
    }

    /// Frame aus rohen Samples
    pub fn float(direction: FrameDirection, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(direction, sample_rate, FramePayload::Float(samples.into()))
    }

    pub fn direction(&self) -> FrameDirection {
        self.direction
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn payload(&self) -> &FramePayload {
        &self.payload
    }

    /// Anzahl der Samples, fuer Transport-Payloads unbekannt
    pub fn sample_count(&self) -> Option<usize> {
        match &self.payload {
            FramePayload::Float(s) => Some(s.len()),
            FramePayload::Pcm16(b) => Some(b.len() / 2),
            FramePayload::Transport(_) => None,
        }
    }

    /// Dauer in Sekunden
    pub fn duration_secs(&self) -> Option<f64> {
        if self.sample_rate == 0 {
            return None;
        }
        self.sample_count()
            .map(|n| n as f64 / f64::from(self.sample_rate))
    }

    /// Liefert die Payload als PCM16, konvertiert bei Bedarf
    pub fn to_pcm16(&self) -> Option<Bytes> {
        match &self.payload {
            FramePayload::Pcm16(b) => Some(b.clone()),
            FramePayload::Float(s) => Some(Bytes::from(encode_pcm16(s))),
            FramePayload::Transport(_) => None,
        }
    }

    /// Liefert die Payload als f32, konvertiert bei Bedarf
    pub fn to_float(&self) -> Option<Arc<[f32]>> {
        match &self.payload {
            FramePayload::Float(s) => Some(Arc::clone(s)),
            FramePayload::Pcm16(b) => Some(decode_pcm16(b).into()),
            FramePayload::Transport(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dauer_aus_samples() {
        let frame = AudioFrame::float(FrameDirection::Capture, 16_000, vec![0.0; 1600]);
        assert_eq!(frame.sample_count(), Some(1600));
        assert!((frame.duration_secs().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn pcm16_und_float_konvertierbar() {
        let frame = AudioFrame::float(FrameDirection::Playback, 24_000, vec![0.5, -0.5]);
        let pcm = frame.to_pcm16().unwrap();
        assert_eq!(pcm.len(), 4);
        let zurueck = AudioFrame::new(FrameDirection::Playback, 24_000, FramePayload::Pcm16(pcm));
        assert_eq!(zurueck.sample_count(), Some(2));
        let floats = zurueck.to_float().unwrap();
        assert!((floats[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn transport_payload_ohne_samples() {
        let frame = AudioFrame::new(
            FrameDirection::Capture,
            16_000,
            FramePayload::Transport(Arc::from("AAAA")),
        );
        assert_eq!(frame.sample_count(), None);
        assert!(frame.to_pcm16().is_none());
    }
}
