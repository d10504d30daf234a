//! REST-Provider (Bland-kompatibel)
//!
//! | Operation          | Anfrage                     |
//! |--------------------|-----------------------------|
//! | Anruf platzieren   | `POST /calls`               |
//! | Details            | `GET /calls/{id}`           |
//! | Live-Mitschnitt    | `POST /calls/{id}/listen`   |
//! | Auflegen           | `POST /calls/{id}/stop`     |
//!
//! Der API-Schluessel geht im `authorization`-Header mit. Die Dauer meldet
//! der Dienst als `call_length` in Minuten.

use std::time::Duration;

use async_trait::async_trait;
use livevoice_core::CallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::provider::{CallDetails, CallProvider, CallRequest, ProviderError, ProviderResult};

/// Standard-Basis-URL
pub const DEFAULT_BASE_URL: &str = "https://api.bland.ai/v1";

/// Konfiguration des REST-Providers
#[derive(Clone, PartialEq, Eq)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// Absender-Rufnummer, sonst waehlt der Dienst
    pub from_number: Option<String>,
    pub model: String,
    pub language: Option<String>,
    /// Anruf aufzeichnen lassen
    pub record: bool,
    pub timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            from_number: None,
            model: "base".to_string(),
            language: None,
            record: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for HttpProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("from_number", &self.from_number)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("record", &self.record)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire-Typen
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PlaceCallBody<'a> {
    phone_number: &'a str,
    task: &'a str,
    voice: &'a str,
    #[serde(skip_serializing_if = "ist_leer")]
    first_sentence: &'a str,
    model: &'a str,
    record: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

fn ist_leer(s: &&str) -> bool {
    s.is_empty()
}

#[derive(Default, Deserialize)]
struct PlaceCallAntwort {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct DetailsAntwort {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    recording_url: Option<String>,
    /// Minuten als Gleitkommazahl
    #[serde(default)]
    call_length: Option<f64>,
}

/// Minuten in ganze Sekunden, 0 und negative Werte gelten als fehlend
pub fn minutes_to_secs(minutes: Option<f64>) -> Option<u64> {
    minutes
        .filter(|m| m.is_finite() && *m > 0.0)
        .map(|m| (m * 60.0).round() as u64)
}

/// Live-URL aus `{"data": {"url": ...}}` oder `{"url": ...}`
fn listen_url(body: &Value) -> Option<String> {
    body.pointer("/data/url")
        .or_else(|| body.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Provider ueber die REST-API
pub struct HttpCallProvider {
    config: HttpProviderConfig,
    client: reqwest::Client,
}

impl HttpCallProvider {
    pub fn new(config: HttpProviderConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Konfiguration("kein API-Schluessel gesetzt".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Konfiguration(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpProviderConfig {
        &self.config
    }

    fn url(&self, pfad: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), pfad)
    }

    fn post(&self, pfad: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(pfad))
            .header("authorization", &self.config.api_key)
    }

    /// Fuehrt die Anfrage aus, leerer Body wird zu `Null`
    async fn json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ProviderResult<(reqwest::StatusCode, Value)> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                ProviderError::Antwort(format!("HTTP {status}: kein JSON ({e})"))
            })?
        };
        Ok((status, body))
    }
}

#[async_trait]
impl CallProvider for HttpCallProvider {
    async fn place_call(&self, request: &CallRequest) -> ProviderResult<CallId> {
        let persona = &request.persona;
        let body = PlaceCallBody {
            phone_number: &request.destination,
            task: &persona.prompt,
            voice: &persona.voice,
            first_sentence: &persona.first_sentence,
            model: &self.config.model,
            record: self.config.record,
            from: self.config.from_number.as_deref(),
            language: self.config.language.as_deref(),
        };

        let (status, json) = self.json(self.post("/calls").json(&body)).await?;
        let antwort: PlaceCallAntwort = if status.is_success() {
            serde_json::from_value(json).map_err(|e| ProviderError::Antwort(e.to_string()))?
        } else {
            serde_json::from_value(json).unwrap_or_default()
        };

        match (status.is_success(), antwort.status.as_deref(), antwort.call_id) {
            (true, Some("success"), Some(id)) if !id.is_empty() => {
                let id = CallId::new(id);
                info!(call_id = %id, persona = %persona.name, "Anruf beim Provider platziert");
                Ok(id)
            }
            _ => {
                let grund = antwort
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}, keine Anruf-ID"));
                warn!(%status, "Anruf abgelehnt: {}", grund);
                Err(ProviderError::Abgelehnt(grund))
            }
        }
    }

    async fn get_call_details(&self, id: &CallId) -> ProviderResult<CallDetails> {
        let request = self
            .client
            .get(self.url(&format!("/calls/{}", id.as_str())))
            .header("authorization", &self.config.api_key);
        let (status, json) = self.json(request).await?;
        if !status.is_success() {
            return Err(ProviderError::Http(format!("HTTP {status}")));
        }
        let antwort: DetailsAntwort =
            serde_json::from_value(json).map_err(|e| ProviderError::Antwort(e.to_string()))?;
        debug!(
            call_id = %id,
            status = ?antwort.status,
            aufnahme = antwort.recording_url.is_some(),
            "Anrufdetails geladen"
        );
        Ok(CallDetails {
            status: antwort.status,
            completed: antwort.completed,
            recording_url: antwort.recording_url.filter(|u| !u.is_empty()),
            duration_secs: minutes_to_secs(antwort.call_length),
        })
    }

    async fn monitor_url(&self, id: &CallId) -> ProviderResult<Option<String>> {
        let (status, json) = self
            .json(self.post(&format!("/calls/{}/listen", id.as_str())))
            .await?;
        if !status.is_success() {
            return Err(ProviderError::Http(format!("HTTP {status}")));
        }
        Ok(listen_url(&json))
    }

    async fn end_call(&self, id: &CallId) -> ProviderResult<()> {
        let (status, _) = self
            .json(self.post(&format!("/calls/{}/stop", id.as_str())))
            .await?;
        if !status.is_success() {
            return Err(ProviderError::Http(format!("HTTP {status}")));
        }
        info!(call_id = %id, "Anruf beim Provider beendet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minuten_werden_gerundet() {
        assert_eq!(minutes_to_secs(Some(1.5)), Some(90));
        assert_eq!(minutes_to_secs(Some(0.0083)), Some(0));
        assert_eq!(minutes_to_secs(Some(2.345)), Some(141));
        assert_eq!(minutes_to_secs(Some(0.0)), None);
        assert_eq!(minutes_to_secs(None), None);
        assert_eq!(minutes_to_secs(Some(f64::NAN)), None);
    }

    #[test]
    fn live_url_varianten() {
        assert_eq!(
            listen_url(&json!({"status": "success", "data": {"url": "wss://a"}})),
            Some("wss://a".into())
        );
        assert_eq!(listen_url(&json!({"url": "wss://b"})), Some("wss://b".into()));
        assert_eq!(listen_url(&json!({"data": {"url": ""}})), None);
        assert_eq!(listen_url(&Value::Null), None);
    }

    #[test]
    fn anfrage_ohne_leere_felder() {
        let body = PlaceCallBody {
            phone_number: "+3247712",
            task: "Qualifiziere den Lead",
            voice: "v1",
            first_sentence: "",
            model: "base",
            record: true,
            from: None,
            language: Some("babel"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["phone_number"], "+3247712");
        assert_eq!(json["language"], "babel");
        assert!(json.get("first_sentence").is_none());
        assert!(json.get("from").is_none());
    }

    #[test]
    fn ohne_schluessel_konfigurationsfehler() {
        let err = HttpCallProvider::new(HttpProviderConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::Konfiguration(_)));
    }

    #[test]
    fn debug_verbirgt_schluessel() {
        let config = HttpProviderConfig {
            api_key: "org_geheim".into(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("org_geheim"));
    }
}
