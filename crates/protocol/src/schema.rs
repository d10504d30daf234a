//! Schema-Beschreibung lokaler Capabilities
//!
//! Der Agent bekommt beim Setup fuer jede Capability Name, Beschreibung und
//! Argument-Form. Argumente sind flach: Zahlen, Strings oder Booleans,
//! optional auf eine Werteliste (`enum`) eingeschraenkt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Typ eines Capability-Arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    /// Prueft ob ein JSON-Wert zu diesem Typ passt
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Beschreibung eines einzelnen Arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Erlaubte Werte (nur fuer Strings)
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl ParameterSpec {
    pub fn new(kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            allowed: None,
        }
    }

    /// Schraenkt einen String-Parameter auf feste Werte ein
    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Prueft Typ und ggf. Werteliste
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        if !self.kind.accepts(value) {
            return false;
        }
        match (&self.allowed, value.as_str()) {
            (Some(allowed), Some(s)) => allowed.iter().any(|a| a == s),
            _ => true,
        }
    }
}

/// Objekt-Schema der Argumente (immer `type: object`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Deklaration einer Capability fuer das Session-Setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    /// Fuegt ein optionales Argument hinzu
    pub fn param(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.properties.insert(name.into(), spec);
        self
    }

    /// Fuegt ein Pflicht-Argument hinzu
    pub fn required_param(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        self.parameters.required.push(name.clone());
        self.parameters.properties.insert(name, spec);
        self
    }

    /// Sucht die Beschreibung eines Arguments
    pub fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.properties.get(name)
    }
}
