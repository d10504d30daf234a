//! Suchfilter-Capability `updateSearchFilters`
//!
//! Der Agent uebersetzt Wuensche des Nutzers in Filterwerte. Jeder Aufruf
//! wird in den aktuellen Filterstand gemischt (neue Werte ueberschreiben,
//! fehlende bleiben erhalten), danach wird die Trefferzahl ermittelt.
//! Den aktuellen Stand kann die Anwendung ueber einen `watch`-Kanal
//! beobachten.

use std::sync::Arc;

use async_trait::async_trait;
use livevoice_protocol::{FunctionDeclaration, ParamKind, ParameterSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use crate::args::ToolArgs;
use crate::capability::{Capability, CapabilityResult};

/// Name der Capability auf der Leitung
pub const UPDATE_FILTERS_NAME: &str = "updateSearchFilters";

/// Art einer Immobilie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Studio,
    Villa,
}

impl PropertyType {
    pub const ALLE: [PropertyType; 4] = [Self::Apartment, Self::House, Self::Studio, Self::Villa];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Studio => "studio",
            Self::Villa => "villa",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALLE
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

/// Sortierung der Treffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Size,
    #[default]
    Default,
}

impl SortOrder {
    pub const ALLE: [SortOrder; 4] = [Self::PriceAsc, Self::PriceDesc, Self::Size, Self::Default];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Size => "size",
            Self::Default => "default",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALLE.into_iter().find(|o| o.as_str() == s)
    }
}

/// Aktueller Filterstand der Suche
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Mindestflaeche in m²
    pub min_size: Option<f64>,
    /// Mindestanzahl Schlafzimmer
    pub bedrooms: Option<u32>,
    pub pets_allowed: Option<bool>,
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub sort_by: SortOrder,
}

impl SearchFilters {
    /// Mischt die Argumente eines Aufrufs in den Stand
    ///
    /// Gibt die Anzahl uebernommener Werte zurueck.
    pub fn merge(&mut self, args: &ToolArgs) -> usize {
        let mut uebernommen = 0;

        if let Some(city) = args.text("city") {
            self.city = Some(city.to_string());
            uebernommen += 1;
        }
        if let Some(v) = args.number("minPrice") {
            self.min_price = Some(v);
            uebernommen += 1;
        }
        if let Some(v) = args.number("maxPrice") {
            self.max_price = Some(v);
            uebernommen += 1;
        }
        if let Some(v) = args.number("minSize") {
            self.min_size = Some(v);
            uebernommen += 1;
        }
        if let Some(v) = args.count("bedrooms") {
            self.bedrooms = Some(v);
            uebernommen += 1;
        }
        if let Some(v) = args.flag("petsAllowed") {
            self.pets_allowed = Some(v);
            uebernommen += 1;
        }
        if let Some(t) = args.text("type").and_then(PropertyType::parse) {
            self.property_type = Some(t);
            uebernommen += 1;
        }
        if let Some(o) = args.text("sortBy").and_then(SortOrder::parse) {
            self.sort_by = o;
            uebernommen += 1;
        }
        uebernommen
    }
}

/// Datenquelle, die Treffer fuer einen Filterstand zaehlt
#[async_trait]
pub trait ListingSearch: Send + Sync {
    async fn count(&self, filters: &SearchFilters) -> CapabilityResult<usize>;
}

/// Die Capability `updateSearchFilters`
pub struct UpdateFiltersCapability {
    search: Arc<dyn ListingSearch>,
    filters: watch::Sender<SearchFilters>,
}

impl UpdateFiltersCapability {
    pub fn new(search: Arc<dyn ListingSearch>) -> Self {
        Self::with_filters(search, SearchFilters::default())
    }

    /// Startet mit einem vorhandenen Filterstand (z.B. aus der Oberflaeche)
    pub fn with_filters(search: Arc<dyn ListingSearch>, initial: SearchFilters) -> Self {
        let (filters, _) = watch::channel(initial);
        Self { search, filters }
    }

    /// Beobachtet den Filterstand
    pub fn subscribe(&self) -> watch::Receiver<SearchFilters> {
        self.filters.subscribe()
    }

    pub fn current(&self) -> SearchFilters {
        self.filters.borrow().clone()
    }

    /// Deklaration fuer das Session-Setup
    pub fn declaration_static() -> FunctionDeclaration {
        FunctionDeclaration::new(
            UPDATE_FILTERS_NAME,
            "Update the apartment search filters based on user request and return the number \
             of listings found. This is how you execute the search.",
        )
        .param(
            "city",
            ParameterSpec::new(ParamKind::String, "City name (e.g. Ghent, Brussels, Antwerp)"),
        )
        .param(
            "minPrice",
            ParameterSpec::new(ParamKind::Number, "Minimum price in Euros"),
        )
        .param(
            "maxPrice",
            ParameterSpec::new(ParamKind::Number, "Maximum price in Euros"),
        )
        .param(
            "minSize",
            ParameterSpec::new(ParamKind::Number, "Minimum size in square meters"),
        )
        .param(
            "bedrooms",
            ParameterSpec::new(ParamKind::Number, "Number of bedrooms"),
        )
        .param(
            "petsAllowed",
            ParameterSpec::new(ParamKind::Boolean, "Whether pets are required"),
        )
        .param(
            "type",
            ParameterSpec::new(ParamKind::String, "Type of property")
                .with_allowed(PropertyType::ALLE.iter().map(PropertyType::as_str)),
        )
        .param(
            "sortBy",
            ParameterSpec::new(ParamKind::String, "Sort order of the results")
                .with_allowed(SortOrder::ALLE.iter().map(SortOrder::as_str)),
        )
    }
}

#[async_trait]
impl Capability for UpdateFiltersCapability {
    fn declaration(&self) -> FunctionDeclaration {
        Self::declaration_static()
    }

    async fn invoke(&self, args: ToolArgs) -> CapabilityResult<Value> {
        // Mischen und Veroeffentlichen unter einer Sperre
        let mut snapshot = SearchFilters::default();
        self.filters.send_modify(|f| {
            f.merge(&args);
            snapshot = f.clone();
        });

        let treffer = self.search.count(&snapshot).await?;
        info!(treffer, filter = ?snapshot, "Suchfilter aktualisiert");
        Ok(Value::String(format!(
            "Filters updated. Found {treffer} properties matching criteria."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use serde_json::json;

    struct Fest(usize);

    #[async_trait]
    impl ListingSearch for Fest {
        async fn count(&self, _filters: &SearchFilters) -> CapabilityResult<usize> {
            Ok(self.0)
        }
    }

    struct Offline;

    #[async_trait]
    impl ListingSearch for Offline {
        async fn count(&self, _filters: &SearchFilters) -> CapabilityResult<usize> {
            Err(CapabilityError::Abfrage("offline".into()))
        }
    }

    #[test]
    fn mischen_ueberschreibt_nur_gesetzte_werte() {
        let mut f = SearchFilters {
            city: Some("Gent".into()),
            max_price: Some(900.0),
            ..Default::default()
        };
        let args = ToolArgs::new()
            .with("maxPrice", 1200.0)
            .with("type", "house")
            .with("sortBy", "price_desc");
        assert_eq!(f.merge(&args), 3);
        assert_eq!(f.city.as_deref(), Some("Gent"));
        assert_eq!(f.max_price, Some(1200.0));
        assert_eq!(f.property_type, Some(PropertyType::House));
        assert_eq!(f.sort_by, SortOrder::PriceDesc);
    }

    #[test]
    fn serde_camel_case() {
        let f = SearchFilters {
            min_price: Some(500.0),
            pets_allowed: Some(true),
            property_type: Some(PropertyType::Studio),
            ..Default::default()
        };
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["minPrice"], json!(500.0));
        assert_eq!(v["petsAllowed"], json!(true));
        assert_eq!(v["type"], json!("studio"));
        assert_eq!(v["sortBy"], json!("default"));
    }

    #[test]
    fn deklaration_hat_alle_felder() {
        let d = UpdateFiltersCapability::declaration_static();
        assert_eq!(d.name, UPDATE_FILTERS_NAME);
        for name in [
            "city", "minPrice", "maxPrice", "minSize", "bedrooms", "petsAllowed", "type", "sortBy",
        ] {
            assert!(d.spec(name).is_some(), "{name} fehlt");
        }
        assert!(d.parameters.required.is_empty());
        assert!(d.spec("type").unwrap().accepts(&json!("villa")));
        assert!(!d.spec("type").unwrap().accepts(&json!("castle")));
    }

    #[tokio::test]
    async fn aufruf_meldet_treffer_und_veroeffentlicht() {
        let cap = UpdateFiltersCapability::new(Arc::new(Fest(7)));
        let mut rx = cap.subscribe();
        let antwort = cap
            .invoke(ToolArgs::new().with("city", "Brussel"))
            .await
            .unwrap();
        assert_eq!(
            antwort,
            json!("Filters updated. Found 7 properties matching criteria.")
        );
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().city.as_deref(), Some("Brussel"));
    }

    #[tokio::test]
    async fn suchfehler_wird_gemeldet() {
        let cap = UpdateFiltersCapability::new(Arc::new(Offline));
        let err = cap
            .invoke(ToolArgs::new().with("minSize", 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Abfrage(_)));
        // Der Stand ist trotzdem uebernommen
        assert_eq!(cap.current().min_size, Some(50.0));
    }
}
