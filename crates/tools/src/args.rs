//! Typisierte Capability-Argumente
//!
//! Der Agent liefert Argumente als JSON-Objekt. Zugelassen sind nur flache
//! Werte (Zahl, String, Boolean), alles andere wird beim Einlesen verworfen.

use std::collections::BTreeMap;

use livevoice_protocol::ParamKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ein einzelner Argumentwert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ArgValue {
    /// Liest einen JSON-Wert, `None` fuer null, Arrays und Objekte
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Boolean,
            Self::Number(_) => ParamKind::Number,
            Self::Text(_) => ParamKind::String,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Argumente eines Aufrufs, nach Namen sortiert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs(BTreeMap<String, ArgValue>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Liest ein JSON-Objekt und gibt zusaetzlich die verworfenen Namen zurueck
    pub fn from_json_map(map: &serde_json::Map<String, Value>) -> (Self, Vec<String>) {
        let mut args = BTreeMap::new();
        let mut dropped = Vec::new();
        for (name, value) in map {
            match ArgValue::from_json(value) {
                Some(v) => {
                    args.insert(name.clone(), v);
                }
                None => dropped.push(name.clone()),
            }
        }
        (Self(args), dropped)
    }

    /// Builder-Variante von [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<ArgValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_f64)
    }

    /// Ganzzahl, nur wenn der Wert ganzzahlig und nicht negativ ist
    pub fn count(&self, name: &str) -> Option<u32> {
        self.number(name)
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Zurueck nach JSON (fuer Logs und Antworten)
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, ArgValue)> for ToolArgs {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verschachtelte_werte_werden_verworfen() {
        let map = json!({
            "city": "Gent",
            "maxPrice": 900,
            "petsAllowed": true,
            "extra": {"a": 1},
            "liste": [1, 2],
            "leer": null
        });
        let (args, mut dropped) = ToolArgs::from_json_map(map.as_object().unwrap());
        dropped.sort();
        assert_eq!(args.len(), 3);
        assert_eq!(args.text("city"), Some("Gent"));
        assert_eq!(args.number("maxPrice"), Some(900.0));
        assert_eq!(args.flag("petsAllowed"), Some(true));
        assert_eq!(dropped, vec!["extra", "leer", "liste"]);
    }

    #[test]
    fn getter_pruefen_typ() {
        let args = ToolArgs::new().with("bedrooms", "zwei").with("minSize", 70.0);
        assert_eq!(args.number("bedrooms"), None);
        assert_eq!(args.text("minSize"), None);
        assert_eq!(args.count("minSize"), Some(70));
    }

    #[test]
    fn count_nur_fuer_ganzzahlen() {
        let args = ToolArgs::new()
            .with("a", 2.5)
            .with("b", -1.0)
            .with("c", 3.0);
        assert_eq!(args.count("a"), None);
        assert_eq!(args.count("b"), None);
        assert_eq!(args.count("c"), Some(3));
    }

    #[test]
    fn json_rueckweg() {
        let args = ToolArgs::new().with("city", "Antwerpen").with("petsAllowed", false);
        assert_eq!(args.to_json(), json!({"city": "Antwerpen", "petsAllowed": false}));
    }
}
