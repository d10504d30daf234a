//! Integration-Tests: updateSearchFilters ueber die Tool-Bridge

use std::sync::Arc;

use livevoice_core::CorrelationId;
use livevoice_protocol::FunctionCall;
use livevoice_tools::{
    CapabilityRegistry, InMemoryListings, Listing, ToolBridge, ToolInvocation, ToolOutcome,
    UpdateFiltersCapability, UPDATE_FILTERS_NAME,
};
use serde_json::json;

fn listing(id: &str, address: &str, price: f64, typ: &str) -> Listing {
    Listing {
        id: id.into(),
        name: id.into(),
        address: address.into(),
        price,
        property_type: typ.into(),
        size: 80.0,
        bedrooms: 2,
        pets_allowed: false,
        description: String::new(),
    }
}

fn aufbau() -> (ToolBridge, Arc<UpdateFiltersCapability>) {
    let bestand = InMemoryListings::new(vec![
        listing("g1", "Korenmarkt 12, 9000 Ghent", 950.0, "apartment"),
        listing("g2", "Oudburg 24, 9000 Ghent", 1450.0, "house"),
        listing("b1", "Louizalaan 5, 1050 Brussels", 1200.0, "apartment"),
    ]);
    let cap = Arc::new(UpdateFiltersCapability::new(Arc::new(bestand)));
    let registry = Arc::new(CapabilityRegistry::new());
    registry.register(cap.clone()).unwrap();
    (ToolBridge::new(registry), cap)
}

fn call(id: &str, args: serde_json::Value) -> ToolInvocation {
    let call: FunctionCall = serde_json::from_value(json!({
        "id": id,
        "name": UPDATE_FILTERS_NAME,
        "args": args,
    }))
    .unwrap();
    ToolInvocation::from_call(&call)
}

#[tokio::test]
async fn filter_werden_ueber_aufrufe_gemischt() {
    let (bridge, cap) = aufbau();

    let r1 = bridge.execute(call("1", json!({"city": "Ghent"}))).await;
    assert_eq!(
        r1.payload(),
        json!({"result": "Filters updated. Found 2 properties matching criteria."})
    );

    let r2 = bridge.execute(call("2", json!({"maxPrice": 1000}))).await;
    assert_eq!(
        r2.payload(),
        json!({"result": "Filters updated. Found 1 properties matching criteria."})
    );
    assert_eq!(r2.id, CorrelationId::from("2"));

    let stand = cap.current();
    assert_eq!(stand.city.as_deref(), Some("Ghent"));
    assert_eq!(stand.max_price, Some(1000.0));
}

#[tokio::test]
async fn falscher_typ_wird_ignoriert() {
    let (bridge, cap) = aufbau();
    let r = bridge
        .execute(call(
            "x",
            json!({"maxPrice": "billig", "type": "castle", "city": "Brussels", "moon": true}),
        ))
        .await;
    assert!(matches!(r.outcome, ToolOutcome::Success(_)));
    let stand = cap.current();
    assert_eq!(stand.max_price, None);
    assert_eq!(stand.property_type, None);
    assert_eq!(stand.city.as_deref(), Some("Brussels"));
}

#[tokio::test]
async fn deklaration_im_setup() {
    let (bridge, _) = aufbau();
    let decls = bridge.declarations();
    assert_eq!(decls.len(), 1);
    let v = serde_json::to_value(&decls[0]).unwrap();
    assert_eq!(v["parameters"]["type"], "object");
    assert_eq!(
        v["parameters"]["properties"]["sortBy"]["enum"],
        json!(["price_asc", "price_desc", "size", "default"])
    );
}
