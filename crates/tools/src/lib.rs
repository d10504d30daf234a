//! livevoice-tools – Lokale Capabilities fuer den Sprach-Agenten
//!
//! # Architektur
//! - [`registry::CapabilityRegistry`] – Name -> Capability
//! - [`bridge::ToolBridge`] – fuehrt Agenten-Aufrufe aus, genau ein Ergebnis pro Aufruf
//! - [`filters::UpdateFiltersCapability`] – `updateSearchFilters` fuer die Immobiliensuche
//! - [`listings::InMemoryListings`] – Bestand im Speicher

pub mod args;
pub mod bridge;
pub mod capability;
pub mod filters;
pub mod listings;
pub mod registry;

// Bequeme Re-Exporte
pub use args::{ArgValue, ToolArgs};
pub use bridge::{shape_args, ToolBridge, ToolInvocation, ToolOutcome, ToolResult};
pub use capability::{Capability, CapabilityError, CapabilityResult};
pub use filters::{
    ListingSearch, PropertyType, SearchFilters, SortOrder, UpdateFiltersCapability,
    UPDATE_FILTERS_NAME,
};
pub use listings::{InMemoryListings, Listing};
pub use registry::{CapabilityRegistry, RegisteredCapability};
