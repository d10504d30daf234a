//! Immobilien-Bestand im Speicher
//!
//! Einfache [`ListingSearch`]-Implementierung fuer Demos und Tests. Der
//! Bestand kann aus einer JSON-Datei (Array von Listings) geladen werden.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{CapabilityError, CapabilityResult};
use crate::filters::{ListingSearch, SearchFilters, SortOrder};

/// Eine Immobilie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Monatsmiete in Euro
    pub price: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    /// Flaeche in m²
    pub size: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Listing {
    fn matches(&self, f: &SearchFilters) -> bool {
        if let Some(city) = &f.city {
            if !self.address.to_lowercase().contains(&city.to_lowercase()) {
                return false;
            }
        }
        if f.min_price.is_some_and(|min| self.price < min) {
            return false;
        }
        if f.max_price.is_some_and(|max| self.price > max) {
            return false;
        }
        if f.min_size.is_some_and(|min| self.size < min) {
            return false;
        }
        if let Some(t) = f.property_type {
            if !self.property_type.to_lowercase().contains(t.as_str()) {
                return false;
            }
        }
        if f.bedrooms.is_some_and(|n| self.bedrooms < n) {
            return false;
        }
        // Nur "Haustiere erwuenscht" filtert, false heisst egal
        if f.pets_allowed == Some(true) && !self.pets_allowed {
            return false;
        }
        true
    }
}

/// Bestand im Speicher
#[derive(Debug, Clone, Default)]
pub struct InMemoryListings {
    listings: Vec<Listing>,
}

impl InMemoryListings {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Laedt ein JSON-Array von Listings
    pub fn from_json_file(path: impl AsRef<Path>) -> CapabilityResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CapabilityError::Abfrage(format!("{} nicht lesbar: {e}", path.display()))
        })?;
        let listings: Vec<Listing> = serde_json::from_str(&text)
            .map_err(|e| CapabilityError::Abfrage(format!("{}: {e}", path.display())))?;
        debug!(anzahl = listings.len(), pfad = %path.display(), "Listings geladen");
        Ok(Self::new(listings))
    }

    /// Alle Treffer in der gewuenschten Reihenfolge
    pub fn search(&self, filters: &SearchFilters) -> Vec<Listing> {
        let mut treffer: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| l.matches(filters))
            .cloned()
            .collect();

        match filters.sort_by {
            SortOrder::PriceAsc => treffer.sort_by(|a, b| a.price.total_cmp(&b.price)),
            SortOrder::PriceDesc => treffer.sort_by(|a, b| b.price.total_cmp(&a.price)),
            SortOrder::Size => treffer.sort_by(|a, b| b.size.total_cmp(&a.size)),
            SortOrder::Default => {}
        }
        treffer
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingSearch for InMemoryListings {
    async fn count(&self, filters: &SearchFilters) -> CapabilityResult<usize> {
        Ok(self.search(filters).len())
    }
}
