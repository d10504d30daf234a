//! PCM-Transport-Codec
//!
//! Wandelt zwischen dem nativen f32-Format des Geraets und dem
//! Leitungsformat des Agenten (16-bit PCM, little-endian, feste Rate).
//!
//! Alle Funktionen sind rein: kein geteilter Zustand, hoechstens eine
//! Allokation pro Aufruf.

use std::borrow::Cow;

use crate::error::{AudioError, AudioResult};

/// Vollausschlag fuer 16-bit PCM
pub const PCM16_FULL_SCALE: f32 = 32768.0;

/// Reduziert die Abtastrate per Box-Filter
///
/// Jeder Ausgabe-Sample ist der Mittelwert eines zusammenhaengenden
/// Eingabefensters (`ratio = source / target` Samples breit). Das glaettet
/// Anteile oberhalb der neuen Nyquist-Frequenz, statt sie wie bei reiner
/// Dezimierung zurueckzufalten. Gelesen wird nie ueber `input.len()` hinaus.
///
/// Bei gleicher Rate wird die Eingabe unveraendert (geliehen) zurueckgegeben.
/// Hochtasten und Rate 0 sind Konfigurationsfehler.
pub fn downsample(input: &[f32], source_rate: u32, target_rate: u32) -> AudioResult<Cow<'_, [f32]>> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AudioError::Konfiguration(format!(
            "Ungueltige Abtastrate: {source_rate} -> {target_rate}"
        )));
    }
    if source_rate == target_rate {
        return Ok(Cow::Borrowed(input));
    }
    if target_rate > source_rate {
        return Err(AudioError::Konfiguration(format!(
            "Hochtasten nicht unterstuetzt: {source_rate} -> {target_rate}"
        )));
    }

    let ratio = f64::from(source_rate) / f64::from(target_rate);
    let out_len = (input.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(out_len);

    let mut offset = 0usize;
    for i in 0..out_len {
        let next = (((i + 1) as f64 * ratio).round() as usize).min(input.len());
        let window = &input[offset.min(next)..next];
        let avg = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f32>() / window.len() as f32
        };
        output.push(avg);
        offset = next;
    }

    Ok(Cow::Owned(output))
}

/// Kodiert f32-Samples als 16-bit PCM (little-endian)
///
/// Samples werden vor dem Skalieren auf [-1, 1] begrenzt, uebersteuerte
/// Eingaben kippen deshalb nie ins Vorzeichen.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&float_to_i16(s).to_le_bytes());
    }
    out
}

/// Dekodiert 16-bit PCM (little-endian) zu f32-Samples
///
/// Ein einzelnes Rest-Byte am Ende wird ignoriert.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / PCM16_FULL_SCALE)
        .collect()
}

/// RMS-Pegel eines Puffers (0.0 fuer leere Eingabe)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

fn float_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    (s * PCM16_FULL_SCALE)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUFE: f32 = 1.0 / PCM16_FULL_SCALE;

    fn energie(samples: &[f32]) -> f64 {
        samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum()
    }

    #[test]
    fn gleiche_rate_unveraendert() {
        let input = vec![0.1f32, -0.2, 0.3];
        let out = downsample(&input, 16_000, 16_000).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &input[..]);
    }

    #[test]
    fn ausgabelaenge_folgt_verhaeltnis() {
        for rate in [16_000u32, 22_050, 32_000, 44_100, 48_000, 96_000] {
            for len in [0usize, 1, 100, 4096, 4097] {
                let input = vec![0.25f32; len];
                let out = downsample(&input, rate, 16_000).unwrap();
                let erwartet = len as f64 * 16_000.0 / f64::from(rate);
                assert!(
                    (out.len() as f64 - erwartet).abs() <= 1.0,
                    "rate={rate} len={len} out={}",
                    out.len()
                );
            }
        }
    }

    #[test]
    fn standard_chunk_48k() {
        let input = vec![0.0f32; 4096];
        assert_eq!(downsample(&input, 48_000, 16_000).unwrap().len(), 1365);
    }

    #[test]
    fn energie_wird_nie_verstaerkt() {
        let input: Vec<f32> = (0..4096)
            .map(|i| ((i as f32) * 0.37).sin() * 0.8 + if i % 7 == 0 { 0.2 } else { -0.1 })
            .collect();
        for rate in [22_050u32, 44_100, 48_000] {
            let out = downsample(&input, rate, 16_000).unwrap();
            assert!(energie(&out) <= energie(&input));
        }
    }

    #[test]
    fn gleichanteil_bleibt_erhalten() {
        let input = vec![0.5f32; 960];
        let out = downsample(&input, 48_000, 16_000).unwrap();
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn nyquist_ton_wird_gemittelt() {
        // Wechselnde Vorzeichen bei 32 kHz liegen genau auf der 16-kHz-Nyquist-Grenze
        let input: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = downsample(&input, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 32);
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn hochtasten_und_rate_null_abgelehnt() {
        assert!(matches!(
            downsample(&[0.0; 4], 16_000, 48_000),
            Err(AudioError::Konfiguration(_))
        ));
        assert!(downsample(&[0.0; 4], 0, 16_000).is_err());
    }

    #[test]
    fn pcm16_roundtrip_innerhalb_einer_stufe() {
        for i in -1000..=1000 {
            let s = i as f32 / 1000.0;
            let zurueck = decode_pcm16(&encode_pcm16(&[s]))[0];
            assert!(
                (zurueck - s).abs() <= STUFE + f32::EPSILON,
                "s={s} zurueck={zurueck}"
            );
        }
    }

    #[test]
    fn pcm16_uebersteuerung_kippt_nicht() {
        let bytes = encode_pcm16(&[1.5, -3.0, 100.0, -1.0001]);
        let werte: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(werte, vec![i16::MAX, i16::MIN, i16::MAX, i16::MIN]);
    }

    #[test]
    fn pcm16_little_endian_und_rest_byte() {
        let bytes = encode_pcm16(&[0.5]);
        assert_eq!(bytes, 16384i16.to_le_bytes().to_vec());
        let mut mit_rest = bytes.clone();
        mit_rest.push(0xAB);
        assert_eq!(decode_pcm16(&mit_rest).len(), 1);
    }

    #[test]
    fn nan_wird_stille() {
        assert_eq!(encode_pcm16(&[f32::NAN]), vec![0, 0]);
    }

    #[test]
    fn rms_werte() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert!((rms(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
    }
}
