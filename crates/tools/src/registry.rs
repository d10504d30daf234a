//! Capability-Registry – Name -> Capability, thread-sicher via DashMap

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use livevoice_protocol::FunctionDeclaration;
use tracing::debug;

use crate::capability::{Capability, CapabilityError, CapabilityResult};

/// Eintrag in der Registry
#[derive(Clone)]
pub struct RegisteredCapability {
    pub declaration: FunctionDeclaration,
    pub capability: Arc<dyn Capability>,
}

/// Registry aller Capabilities einer Anwendung
///
/// Die Deklaration wird beim Registrieren einmal gelesen und festgehalten,
/// Setup-Nachricht und Argumentpruefung sehen damit dieselbe Form.
#[derive(Default)]
pub struct CapabilityRegistry {
    eintraege: DashMap<String, RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registriert eine Capability unter dem Namen ihrer Deklaration
    pub fn register(&self, capability: Arc<dyn Capability>) -> CapabilityResult<()> {
        let declaration = capability.declaration();
        let name = declaration.name.clone();
        if name.trim().is_empty() {
            return Err(CapabilityError::UngueltigeDeklaration(
                "leerer Name".into(),
            ));
        }

        match self.eintraege.entry(name.clone()) {
            Entry::Occupied(_) => Err(CapabilityError::BereitsRegistriert(name)),
            Entry::Vacant(slot) => {
                slot.insert(RegisteredCapability {
                    declaration,
                    capability,
                });
                debug!(capability = %name, "Capability registriert");
                Ok(())
            }
        }
    }

    /// Entfernt eine Capability, gibt false zurueck wenn sie unbekannt war
    pub fn unregister(&self, name: &str) -> bool {
        self.eintraege.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<RegisteredCapability> {
        self.eintraege.get(name).map(|e| e.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.eintraege.contains_key(name)
    }

    /// Alle Deklarationen, nach Namen sortiert
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        let mut decls: Vec<_> = self
            .eintraege
            .iter()
            .map(|e| e.value().declaration.clone())
            .collect();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        decls
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.eintraege.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }
}
