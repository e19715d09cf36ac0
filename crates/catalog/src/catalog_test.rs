//! Tests for the catalog table

use super::*;
use serde_json::json;

fn entry(name: &str) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        attributes: Value::Object(serde_json::Map::new()),
    }
}

// ============================================================================
// Lookup tests
// ============================================================================

#[test]
fn test_lookup_is_case_insensitive() {
    let catalog = Catalog::from_entries([entry("Sword of Testing")]);

    assert!(catalog.get("Sword of Testing").is_some());
    assert!(catalog.get("sword of testing").is_some());
    assert!(catalog.get("SWORD OF TESTING").is_some());
    assert!(catalog.get("Sword").is_none());
}

#[test]
fn test_lookup_preserves_source_spelling() {
    let catalog = Catalog::from_entries([entry("Sword of Testing")]);
    let found = catalog.get("sword of testing").unwrap();
    assert_eq!(found.name, "Sword of Testing");
}

#[test]
fn test_collision_first_match_wins() {
    let first = CatalogEntry {
        name: "Shield".to_string(),
        attributes: json!({"id": 1}),
    };
    let second = CatalogEntry {
        name: "SHIELD".to_string(),
        attributes: json!({"id": 2}),
    };
    let catalog = Catalog::from_entries([first, second]);

    assert_eq!(catalog.len(), 1);
    let found = catalog.get("shield").unwrap();
    assert_eq!(found.name, "Shield");
    assert_eq!(found.attributes, json!({"id": 1}));
}

// ============================================================================
// JSON loading tests
// ============================================================================

#[test]
fn test_from_json_array() {
    let body = br#"[
        {"Name": "Sword of Testing", "ItemId": 101},
        {"Name": "Shield", "ItemId": 102}
    ]"#;
    let catalog = Catalog::from_json_slice(body).unwrap();

    assert_eq!(catalog.len(), 2);
    let sword = catalog.get("sword of testing").unwrap();
    assert_eq!(sword.attributes, json!({"ItemId": 101}));
}

#[test]
fn test_from_json_skips_nameless_entries() {
    let body = br#"[
        {"Name": "Shield"},
        {"ItemId": 7},
        {"Name": 42},
        "not an object"
    ]"#;
    let catalog = Catalog::from_json_slice(body).unwrap();
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_from_json_rejects_non_array() {
    let err = Catalog::from_json_slice(br#"{"Name": "Shield"}"#).unwrap_err();
    assert!(matches!(err, CatalogError::NotAnArray));

    assert!(Catalog::from_json_slice(b"not json at all").is_err());
}

// ============================================================================
// Shared handle tests
// ============================================================================

#[test]
fn test_shared_swap_replaces_wholesale() {
    let shared = SharedCatalog::empty();
    assert!(shared.load().is_empty());

    shared.swap(Catalog::from_entries([entry("Shield")]));
    assert_eq!(shared.load().len(), 1);

    // Old guard keeps the table it loaded
    let old = shared.load();
    shared.swap(Catalog::new());
    assert_eq!(old.len(), 1);
    assert!(shared.load().is_empty());
}
