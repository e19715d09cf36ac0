//! Tests for the catalog fetcher

use super::*;

#[test]
fn test_construction_reports_client_errors() {
    // The default builder configuration is valid; construction succeeds and
    // any failure surfaces as an error instead of a panic
    let fetcher = CatalogFetcher::new("http://localhost/items", SharedCatalog::empty());
    assert!(fetcher.is_ok());
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_catalog() {
    let shared = SharedCatalog::empty();
    shared.swap(Catalog::from_json_slice(br#"[{"Name":"Sword of Testing"}]"#).unwrap());

    // Port 9 (discard) refuses connections on a loopback-only host
    let fetcher = CatalogFetcher::new("http://127.0.0.1:9/items", shared.clone()).unwrap();
    assert!(fetcher.refresh_once().await.is_err());

    let catalog = shared.load();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("sword of testing").is_some());
}
