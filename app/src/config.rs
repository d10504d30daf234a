//! Anwendungs-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, eine fehlende oder leere Datei ergibt eine lauffaehige
//! Konfiguration. Schluessel koennen aus der Umgebung kommen:
//! `LIVEVOICE_AGENT_KEY`, `LIVEVOICE_TELEPHONY_KEY`.

use std::time::Duration;

use livevoice_audio::CaptureConstraints;
use livevoice_call::{
    AnswerPolicy, CallConfig, HttpProviderConfig, Persona, RetrievalPolicy, DEFAULT_BASE_URL,
};
use livevoice_observability::LogConfig;
use livevoice_session::{SessionConfig, WsTransport};
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG: &str = "LIVEVOICE_CONFIG";
pub const ENV_AGENT_KEY: &str = "LIVEVOICE_AGENT_KEY";
pub const ENV_TELEPHONY_KEY: &str = "LIVEVOICE_TELEPHONY_KEY";

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentEinstellungen,
    pub audio: AudioEinstellungen,
    pub telephony: TelefonieEinstellungen,
    pub persona: Persona,
    pub listings: BestandEinstellungen,
    pub logging: LogConfig,
}

/// Verbindung zum Sprach-Agenten
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEinstellungen {
    /// WebSocket-Endpunkt
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    /// Frist fuer Verbindung und Setup in Sekunden
    pub connect_timeout_secs: f64,
    pub input_transcription: bool,
}

impl Default for AgentEinstellungen {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            url: "ws://127.0.0.1:9400/live".into(),
            api_key: String::new(),
            model: session.model,
            voice: session.voice,
            system_instruction: "You are a helpful assistant.".into(),
            connect_timeout_secs: session.connect_timeout.as_secs_f64(),
            input_transcription: session.input_transcription,
        }
    }
}

impl std::fmt::Debug for AgentEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentEinstellungen")
            .field("url", &self.url)
            .field("api_key", &verdeckt(&self.api_key))
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("input_transcription", &self.input_transcription)
            .finish_non_exhaustive()
    }
}

/// Geraete und Aufbereitung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Teilstring des Mikrofon-Namens, leer = Standardgeraet
    pub eingabe: Option<String>,
    /// Teilstring des Lautsprecher-Namens, leer = Standardgeraet
    pub ausgabe: Option<String>,
    /// Samples pro Chunk bei Geraeterate
    pub chunk_size: usize,
    pub constraints: CaptureConstraints,
    /// Freizeichen beim Anrufen abspielen
    pub freizeichen: bool,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            eingabe: None,
            ausgabe: None,
            chunk_size: SessionConfig::default().chunk_size,
            constraints: CaptureConstraints::default(),
            freizeichen: true,
        }
    }
}

/// Telefonie-Provider und Anrufablauf
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelefonieEinstellungen {
    pub base_url: String,
    pub api_key: String,
    pub from_number: Option<String>,
    pub model: String,
    pub language: Option<String>,
    pub record: bool,
    pub timeout_secs: f64,
    /// Klingelfenster in Sekunden, danach gilt der Anruf als angenommen
    pub klingeln_secs: f64,
    /// Auf Abheben-Signal des Providers warten statt Klingelfenster
    pub auf_signal_warten: bool,
    /// Verweildauer nach Anrufende bis zur Rueckkehr nach Idle
    pub zuruecksetzen_secs: f64,
    /// Statusabfrage waehrend des Gespraechs, 0 = aus
    pub status_intervall_secs: f64,
    pub abruf_verzoegerung_secs: f64,
    pub abruf_intervall_secs: f64,
    pub abruf_versuche: u32,
}

impl Default for TelefonieEinstellungen {
    fn default() -> Self {
        let http = HttpProviderConfig::default();
        let retrieval = RetrievalPolicy::default();
        let call = CallConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: String::new(),
            from_number: None,
            model: http.model,
            language: None,
            record: http.record,
            timeout_secs: http.timeout.as_secs_f64(),
            klingeln_secs: 9.0,
            auf_signal_warten: false,
            zuruecksetzen_secs: call.reset_after.as_secs_f64(),
            status_intervall_secs: call.status_poll.map_or(0.0, |d| d.as_secs_f64()),
            abruf_verzoegerung_secs: retrieval.initial_delay.as_secs_f64(),
            abruf_intervall_secs: retrieval.retry_delay.as_secs_f64(),
            abruf_versuche: retrieval.max_attempts,
        }
    }
}

impl std::fmt::Debug for TelefonieEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelefonieEinstellungen")
            .field("base_url", &self.base_url)
            .field("api_key", &verdeckt(&self.api_key))
            .field("from_number", &self.from_number)
            .field("klingeln_secs", &self.klingeln_secs)
            .field("auf_signal_warten", &self.auf_signal_warten)
            .finish_non_exhaustive()
    }
}

/// Immobilienbestand fuer `updateSearchFilters`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BestandEinstellungen {
    /// JSON-Datei mit Objekten, leer = leerer Bestand
    pub datei: Option<String>,
}

fn verdeckt(key: &str) -> &'static str {
    if key.is_empty() {
        "<leer>"
    } else {
        "***"
    }
}

/// Negative oder ungueltige Werte werden zu 0
fn sekunden(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl AppConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        Ok(config.mit_umgebung(|name| std::env::var(name).ok()))
    }

    /// Ueberschreibt Schluessel aus der Umgebung
    pub fn mit_umgebung(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(ENV_AGENT_KEY).filter(|k| !k.is_empty()) {
            self.agent.api_key = key;
        }
        if let Some(key) = lookup(ENV_TELEPHONY_KEY).filter(|k| !k.is_empty()) {
            self.telephony.api_key = key;
        }
        self
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            model: self.agent.model.clone(),
            system_instruction: self.agent.system_instruction.clone(),
            voice: self.agent.voice.clone(),
            chunk_size: self.audio.chunk_size,
            connect_timeout: sekunden(self.agent.connect_timeout_secs),
            input_transcription: self.agent.input_transcription,
            constraints: self.audio.constraints.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn transport(&self) -> WsTransport {
        let transport = WsTransport::new(self.agent.url.clone());
        if self.agent.api_key.is_empty() {
            transport
        } else {
            transport.with_api_key(self.agent.api_key.clone())
        }
    }

    pub fn provider_config(&self) -> HttpProviderConfig {
        let t = &self.telephony;
        HttpProviderConfig {
            base_url: t.base_url.clone(),
            api_key: t.api_key.clone(),
            from_number: t.from_number.clone(),
            model: t.model.clone(),
            language: t.language.clone(),
            record: t.record,
            timeout: sekunden(t.timeout_secs),
        }
    }

    pub fn call_config(&self) -> CallConfig {
        let t = &self.telephony;
        let answer = if t.auf_signal_warten {
            AnswerPolicy::ProviderSignal {
                fallback: (t.klingeln_secs > 0.0).then(|| sekunden(t.klingeln_secs)),
            }
        } else {
            AnswerPolicy::RingTimeout(sekunden(t.klingeln_secs))
        };
        CallConfig {
            answer,
            reset_after: sekunden(t.zuruecksetzen_secs),
            retrieval: RetrievalPolicy {
                initial_delay: sekunden(t.abruf_verzoegerung_secs),
                retry_delay: sekunden(t.abruf_intervall_secs),
                max_attempts: t.abruf_versuche,
            },
            status_poll: (t.status_intervall_secs > 0.0).then(|| sekunden(t.status_intervall_secs)),
        }
    }
}
