//! Barcode resolution tests against catalog types
//!
//! Covers exact bulk matching, item-tracked prefix matching, the bulk-first
//! priority, and the not-found case.

use chrono::Utc;
use uuid::Uuid;

use shared::{resolve_barcode, BarcodeMatch, TrackingMode};
use supply_tracking_backend::services::catalog::InventoryType;

fn make_type(name: &str, mode: TrackingMode, key: Option<&str>, stock: i32) -> InventoryType {
    let now = Utc::now();
    InventoryType {
        id: Uuid::new_v4(),
        name: name.to_string(),
        unit: "unit".to_string(),
        tracking_mode: mode.as_str().to_string(),
        barcode_key: key.map(|k| k.to_string()),
        requires_lot: false,
        stock_quantity: stock,
        description: None,
        created_at: now,
        updated_at: now,
    }
}

fn catalog() -> Vec<InventoryType> {
    vec![
        make_type("Ethanol 90%", TrackingMode::Bulk, Some("OVB"), 50),
        make_type("Giemsa stain", TrackingMode::ItemTracked, Some("GS"), 12),
        make_type("Aerobic blood bottle", TrackingMode::ItemTracked, Some("AR"), 30),
    ]
}

#[test]
fn test_exact_bulk_code_resolves_bulk() {
    let types = catalog();
    match resolve_barcode("OVB", &types) {
        BarcodeMatch::Bulk(ty) => {
            assert_eq!(ty.name, "Ethanol 90%");
            assert_eq!(ty.mode(), TrackingMode::Bulk);
        }
        _ => panic!("expected bulk match"),
    }
}

#[test]
fn test_unit_barcode_resolves_by_prefix() {
    let types = catalog();
    match resolve_barcode("AR1234567", &types) {
        BarcodeMatch::Prefix(ty) => {
            assert_eq!(ty.name, "Aerobic blood bottle");
            assert_eq!(ty.mode(), TrackingMode::ItemTracked);
        }
        _ => panic!("expected prefix match"),
    }
}

#[test]
fn test_unknown_barcode_matches_nothing() {
    let types = catalog();
    assert!(resolve_barcode("ZZ999", &types).is_no_match());
}

#[test]
fn test_bulk_exact_match_beats_prefix() {
    // A bulk representative code that extends an item-tracked prefix still
    // resolves as the bulk type.
    let types = vec![
        make_type("bottle", TrackingMode::ItemTracked, Some("AR"), 10),
        make_type("swab pack", TrackingMode::Bulk, Some("AR50"), 10),
    ];
    match resolve_barcode("AR50", &types) {
        BarcodeMatch::Bulk(ty) => assert_eq!(ty.name, "swab pack"),
        _ => panic!("expected bulk match"),
    }
}

#[test]
fn test_registration_order_breaks_prefix_ties() {
    let types = vec![
        make_type("first registered", TrackingMode::ItemTracked, Some("AB"), 1),
        make_type("second registered", TrackingMode::ItemTracked, Some("AB1"), 1),
    ];
    match resolve_barcode("AB123", &types) {
        BarcodeMatch::Prefix(ty) => assert_eq!(ty.name, "first registered"),
        _ => panic!("expected prefix match"),
    }
}

#[test]
fn test_types_without_keys_never_match() {
    let types = vec![
        make_type("unlabeled bulk", TrackingMode::Bulk, None, 5),
        make_type("unlabeled tracked", TrackingMode::ItemTracked, None, 5),
    ];
    assert!(resolve_barcode("ANYTHING", &types).is_no_match());
}
