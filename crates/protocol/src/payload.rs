//! Audio-Payloads im Nachrichtenformat
//!
//! PCM-Daten reisen base64-kodiert (Standard-Alphabet) in JSON-Nachrichten,
//! das Format steht im MIME-Typ: `audio/pcm;rate=16000`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::wire::ProtocolError;

/// MIME-Basistyp fuer 16-bit PCM little-endian
pub const PCM_MIME_BASE: &str = "audio/pcm";

/// Baut den MIME-Typ fuer PCM mit gegebener Abtastrate
pub fn pcm_mime(rate: u32) -> String {
    format!("{PCM_MIME_BASE};rate={rate}")
}

/// Liest die Abtastrate aus einem PCM-MIME-Typ
///
/// Gibt `None` zurueck wenn der Typ kein PCM ist oder keine gueltige Rate
/// traegt. `audio/pcm` ohne Parameter liefert ebenfalls `None`, der
/// Aufrufer setzt dann seine Standard-Ausgaberate ein.
pub fn parse_pcm_rate(mime: &str) -> Option<u32> {
    let mut teile = mime.split(';').map(str::trim);
    let basis = teile.next()?;
    if !basis.eq_ignore_ascii_case(PCM_MIME_BASE) {
        return None;
    }
    teile
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, v)| v.trim().parse().ok())
        .filter(|r| *r > 0)
}

/// Prueft ob der MIME-Typ PCM-Audio beschreibt
pub fn is_pcm(mime: &str) -> bool {
    mime.split(';')
        .next()
        .is_some_and(|b| b.trim().eq_ignore_ascii_case(PCM_MIME_BASE))
}

/// Kodiert rohe Bytes als base64
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Dekodiert einen base64-Payload
pub fn decode_payload(data: &str) -> Result<Vec<u8>, ProtocolError> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| ProtocolError::Payload(e.to_string()))
}
