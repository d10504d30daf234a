//! Audio-Geraete-Enumeration und -Auswahl
//!
//! Listet Ein- und Ausgabegeraete des Standard-Hosts auf und loest einen
//! konfigurierten Geraetenamen (Teilstring) in ein cpal-Device auf.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};

/// Richtung eines Geraets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    Input,
    Output,
}

/// Beschreibung eines Audio-Geraets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioDevice {
    /// Anzeigename des Geraets
    pub name: String,
    pub direction: DeviceDirection,
    /// Standard-Abtastrate des Geraets
    pub default_rate: Option<u32>,
    /// Maximale Kanalanzahl
    pub channels: u16,
    /// Ob es das Standardgeraet des Hosts ist
    pub is_default: bool,
}

/// Listet alle Geraete einer Richtung auf
pub fn list_devices(direction: DeviceDirection) -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = default_cpal_device(&host, direction).and_then(|d| d.name().ok());
    let devices = match direction {
        DeviceDirection::Input => host.input_devices(),
        DeviceDirection::Output => host.output_devices(),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut result = Vec::new();
    for device in devices {
        match describe(&device, direction, default_name.as_deref()) {
            Ok(d) => result.push(d),
            Err(e) => warn!(?direction, "Geraet konnte nicht gelesen werden: {}", e),
        }
    }
    debug!(?direction, anzahl = result.len(), "Geraete gefunden");
    Ok(result)
}

/// Loest ein Geraet auf: `None` waehlt das Standardgeraet, sonst das erste
/// Geraet, dessen Name `name` enthaelt
pub fn resolve_device(direction: DeviceDirection, name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    let Some(gesucht) = name else {
        return default_cpal_device(&host, direction).ok_or(match direction {
            DeviceDirection::Input => AudioError::KeinStandardEingabegeraet,
            DeviceDirection::Output => AudioError::KeinStandardAusgabegeraet,
        });
    };

    let devices = match direction {
        DeviceDirection::Input => host.input_devices(),
        DeviceDirection::Output => host.output_devices(),
    }
    .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    for device in devices {
        if device.name().is_ok_and(|n| n.contains(gesucht)) {
            return Ok(device);
        }
    }
    Err(AudioError::GeraetNichtGefunden(gesucht.to_string()))
}

fn default_cpal_device(host: &cpal::Host, direction: DeviceDirection) -> Option<Device> {
    match direction {
        DeviceDirection::Input => host.default_input_device(),
        DeviceDirection::Output => host.default_output_device(),
    }
}

// Hilfsfunktion: cpal Device -> AudioDevice
fn describe(
    device: &Device,
    direction: DeviceDirection,
    default_name: Option<&str>,
) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let (default_rate, channels) = match direction {
        DeviceDirection::Input => device
            .default_input_config()
            .map(|c| (Some(c.sample_rate().0), c.channels()))
            .unwrap_or((None, 1)),
        DeviceDirection::Output => device
            .default_output_config()
            .map(|c| (Some(c.sample_rate().0), c.channels()))
            .unwrap_or((None, 2)),
    };

    Ok(AudioDevice {
        is_default: default_name == Some(name.as_str()),
        name,
        direction,
        default_rate,
        channels,
    })
}
