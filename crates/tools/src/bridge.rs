//! Tool-Bridge: Agenten-Aufruf -> Capability -> genau ein Ergebnis
//!
//! Jeder Aufruf endet in genau einem [`ToolResult`] mit derselben
//! Korrelations-ID, auch wenn die Capability fehlschlaegt, panikt oder
//! unbekannt ist. Argumente ausserhalb der deklarierten Form werden vor dem
//! Aufruf entfernt, nicht abgelehnt.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use livevoice_core::{CorrelationId, LiveVoiceError};
use livevoice_protocol::{FunctionCall, FunctionDeclaration, FunctionResponse};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::args::ToolArgs;
use crate::registry::CapabilityRegistry;

/// Ein Capability-Aufruf des Agenten
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: CorrelationId,
    pub name: String,
    pub args: ToolArgs,
}

impl ToolInvocation {
    pub fn new(id: impl Into<CorrelationId>, name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Uebernimmt einen Aufruf von der Leitung, nicht flache Werte entfallen
    pub fn from_call(call: &FunctionCall) -> Self {
        let (args, dropped) = ToolArgs::from_json_map(&call.args);
        if !dropped.is_empty() {
            debug!(
                correlation_id = %call.id,
                capability = %call.name,
                ?dropped,
                "Nicht flache Argumente verworfen"
            );
        }
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            args,
        }
    }
}

/// Ausgang eines Aufrufs
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
    NotFound,
}

/// Ergebnis zu genau einem [`ToolInvocation`]
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub id: CorrelationId,
    pub name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(id: CorrelationId, name: impl Into<String>, value: Value) -> Self {
        Self {
            id,
            name: name.into(),
            outcome: ToolOutcome::Success(value),
        }
    }

    pub fn failure(id: CorrelationId, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            outcome: ToolOutcome::Failure(reason.into()),
        }
    }

    pub fn not_found(id: CorrelationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            outcome: ToolOutcome::NotFound,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// Antwort-Objekt fuer den Agenten
    pub fn payload(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(value) => json!({ "result": value }),
            ToolOutcome::Failure(reason) => json!({ "error": reason }),
            ToolOutcome::NotFound => {
                json!({ "error": format!("capability not found: {}", self.name) })
            }
        }
    }

    /// Fehler in der Taxonomie, `None` bei Erfolg
    pub fn error(&self) -> Option<LiveVoiceError> {
        let grund = match &self.outcome {
            ToolOutcome::Success(_) => return None,
            ToolOutcome::Failure(reason) => reason.clone(),
            ToolOutcome::NotFound => "capability not found".to_string(),
        };
        Some(LiveVoiceError::ToolExecutionFailure {
            capability: self.name.clone(),
            grund,
        })
    }

    pub fn to_response(&self) -> FunctionResponse {
        FunctionResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            response: self.payload(),
        }
    }
}

/// Entfernt Argumente, die nicht deklariert sind oder nicht zur Form passen
pub fn shape_args(declaration: &FunctionDeclaration, args: ToolArgs) -> ToolArgs {
    args.iter()
        .filter(|(name, value)| match declaration.spec(name) {
            Some(spec) => spec.accepts(&value.to_json()),
            None => false,
        })
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unbekannte Panic".to_string()
    }
}

/// Fuehrt Aufrufe gegen eine [`CapabilityRegistry`] aus
#[derive(Clone)]
pub struct ToolBridge {
    registry: Arc<CapabilityRegistry>,
}

impl ToolBridge {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.registry.declarations()
    }

    /// Fuehrt einen Aufruf aus, liefert immer genau ein Ergebnis
    pub async fn execute(&self, invocation: ToolInvocation) -> ToolResult {
        let ToolInvocation { id, name, args } = invocation;

        let Some(entry) = self.registry.get(&name) else {
            warn!(correlation_id = %id, capability = %name, "Unbekannte Capability");
            return ToolResult::not_found(id, name);
        };

        let vorher = args.len();
        let args = shape_args(&entry.declaration, args);
        if args.len() < vorher {
            debug!(
                correlation_id = %id,
                capability = %name,
                ignoriert = vorher - args.len(),
                "Argumente ausserhalb der Deklaration ignoriert"
            );
        }

        let aufruf = entry.capability.invoke(args);
        match AssertUnwindSafe(aufruf).catch_unwind().await {
            Ok(Ok(value)) => {
                debug!(correlation_id = %id, capability = %name, "Capability erfolgreich");
                ToolResult::success(id, name, value)
            }
            Ok(Err(e)) => {
                warn!(correlation_id = %id, capability = %name, "Capability fehlgeschlagen: {}", e);
                ToolResult::failure(id, name, e.to_string())
            }
            Err(panic) => {
                let text = panic_text(panic.as_ref());
                warn!(correlation_id = %id, capability = %name, "Capability abgestuerzt: {}", text);
                ToolResult::failure(id, name, format!("Capability abgestuerzt: {text}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilityError, CapabilityResult};
    use async_trait::async_trait;
    use livevoice_protocol::{ParamKind, ParameterSpec};

    struct Zaehler;

    #[async_trait]
    impl Capability for Zaehler {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration::new("zaehlen", "Zaehlt Argumente")
                .param("city", ParameterSpec::new(ParamKind::String, "Stadt"))
                .param(
                    "type",
                    ParameterSpec::new(ParamKind::String, "Art").with_allowed(["house", "villa"]),
                )
        }

        async fn invoke(&self, args: ToolArgs) -> CapabilityResult<Value> {
            Ok(json!(args.len()))
        }
    }

    struct Kaputt;

    #[async_trait]
    impl Capability for Kaputt {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration::new("kaputt", "Schlaegt immer fehl")
        }

        async fn invoke(&self, _args: ToolArgs) -> CapabilityResult<Value> {
            Err(CapabilityError::Abfrage("Datenbank weg".into()))
        }
    }

    struct Panisch;

    #[async_trait]
    impl Capability for Panisch {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration::new("panisch", "Panikt")
        }

        async fn invoke(&self, _args: ToolArgs) -> CapabilityResult<Value> {
            panic!("boom");
        }
    }

    fn bridge() -> ToolBridge {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.register(Arc::new(Zaehler)).unwrap();
        registry.register(Arc::new(Kaputt)).unwrap();
        registry.register(Arc::new(Panisch)).unwrap();
        ToolBridge::new(registry)
    }

    #[tokio::test]
    async fn unbekannte_argumente_werden_ignoriert() {
        let args = ToolArgs::new()
            .with("city", "Gent")
            .with("type", "castle")
            .with("unbekannt", 1.0);
        let result = bridge()
            .execute(ToolInvocation::new("a", "zaehlen", args))
            .await;
        assert_eq!(result.outcome, ToolOutcome::Success(json!(1)));
        assert_eq!(result.payload(), json!({"result": 1}));
    }

    #[tokio::test]
    async fn fehler_wird_ergebnis() {
        let result = bridge()
            .execute(ToolInvocation::new("b", "kaputt", ToolArgs::new()))
            .await;
        assert_eq!(result.id.as_str(), "b");
        assert!(!result.is_success());
        assert_eq!(
            result.payload(),
            json!({"error": "Abfrage fehlgeschlagen: Datenbank weg"})
        );
        assert!(matches!(
            result.error(),
            Some(LiveVoiceError::ToolExecutionFailure { .. })
        ));
    }

    #[tokio::test]
    async fn panic_wird_ergebnis() {
        let result = bridge()
            .execute(ToolInvocation::new("p", "panisch", ToolArgs::new()))
            .await;
        match result.outcome {
            ToolOutcome::Failure(text) => assert!(text.contains("boom")),
            other => panic!("unerwartet: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unbekannte_capability() {
        let result = bridge()
            .execute(ToolInvocation::new("x", "fliegen", ToolArgs::new()))
            .await;
        assert_eq!(result.outcome, ToolOutcome::NotFound);
        assert_eq!(
            result.payload(),
            json!({"error": "capability not found: fliegen"})
        );
        let response = result.to_response();
        assert_eq!(response.id.as_str(), "x");
        assert_eq!(response.name, "fliegen");
    }

    #[test]
    fn aufruf_von_der_leitung() {
        let call: FunctionCall = serde_json::from_value(json!({
            "id": "c1",
            "name": "zaehlen",
            "args": {"city": "Gent", "verschachtelt": {"a": 1}}
        }))
        .unwrap();
        let inv = ToolInvocation::from_call(&call);
        assert_eq!(inv.args.len(), 1);
        assert_eq!(inv.id.as_str(), "c1");
    }
}
