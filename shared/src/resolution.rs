//! Barcode-to-type resolution
//!
//! A scanned barcode identifies either a whole bulk category (exact match on
//! its representative code) or an individually tracked unit (the barcode
//! starts with an item-tracked type's prefix code). Bulk exact matches win
//! over prefix matches; among prefix candidates the first registered type
//! wins, since prefixes are required to be non-overlapping.

use crate::types::TrackingMode;

/// Anything that carries a tracking mode and an optional barcode key
pub trait BarcodeKeyed {
    fn tracking_mode(&self) -> TrackingMode;
    fn barcode_key(&self) -> Option<&str>;
}

/// Result of resolving a scanned barcode against the type catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeMatch<'a, T> {
    /// Exact match on a bulk type's representative code
    Bulk(&'a T),
    /// Prefix match on an item-tracked type's prefix code
    Prefix(&'a T),
    /// The barcode matched no registered type
    NoMatch,
}

impl<'a, T> BarcodeMatch<'a, T> {
    pub fn is_no_match(&self) -> bool {
        matches!(self, BarcodeMatch::NoMatch)
    }
}

/// Resolve a scanned barcode against the catalog, in registration order
pub fn resolve_barcode<'a, T: BarcodeKeyed>(barcode: &str, types: &'a [T]) -> BarcodeMatch<'a, T> {
    if barcode.is_empty() {
        return BarcodeMatch::NoMatch;
    }

    for ty in types {
        if ty.tracking_mode() == TrackingMode::Bulk && ty.barcode_key() == Some(barcode) {
            return BarcodeMatch::Bulk(ty);
        }
    }

    for ty in types {
        if ty.tracking_mode() == TrackingMode::ItemTracked {
            if let Some(prefix) = ty.barcode_key() {
                if !prefix.is_empty() && barcode.starts_with(prefix) {
                    return BarcodeMatch::Prefix(ty);
                }
            }
        }
    }

    BarcodeMatch::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestType {
        name: &'static str,
        mode: TrackingMode,
        key: Option<&'static str>,
    }

    impl BarcodeKeyed for TestType {
        fn tracking_mode(&self) -> TrackingMode {
            self.mode
        }
        fn barcode_key(&self) -> Option<&str> {
            self.key
        }
    }

    fn catalog() -> Vec<TestType> {
        vec![
            TestType { name: "ethanol", mode: TrackingMode::Bulk, key: Some("OVB") },
            TestType { name: "reagent", mode: TrackingMode::ItemTracked, key: Some("RG") },
            TestType { name: "aerobic bottle", mode: TrackingMode::ItemTracked, key: Some("AR") },
            TestType { name: "unlabeled", mode: TrackingMode::Bulk, key: None },
        ]
    }

    #[test]
    fn test_exact_bulk_match() {
        let types = catalog();
        match resolve_barcode("OVB", &types) {
            BarcodeMatch::Bulk(t) => assert_eq!(t.name, "ethanol"),
            other => panic!("expected bulk match, got {:?}", other.is_no_match()),
        }
    }

    #[test]
    fn test_prefix_match() {
        let types = catalog();
        match resolve_barcode("AR1234567", &types) {
            BarcodeMatch::Prefix(t) => assert_eq!(t.name, "aerobic bottle"),
            _ => panic!("expected prefix match"),
        }
    }

    #[test]
    fn test_bulk_match_wins_over_prefix() {
        // A bulk code that also happens to extend an item-tracked prefix
        // must resolve as the bulk type.
        let types = vec![
            TestType { name: "bottle", mode: TrackingMode::ItemTracked, key: Some("AR") },
            TestType { name: "swabs", mode: TrackingMode::Bulk, key: Some("AR99") },
        ];
        match resolve_barcode("AR99", &types) {
            BarcodeMatch::Bulk(t) => assert_eq!(t.name, "swabs"),
            _ => panic!("expected bulk match"),
        }
    }

    #[test]
    fn test_first_registered_prefix_wins() {
        let types = vec![
            TestType { name: "first", mode: TrackingMode::ItemTracked, key: Some("AB") },
            TestType { name: "second", mode: TrackingMode::ItemTracked, key: Some("AB") },
        ];
        match resolve_barcode("AB001", &types) {
            BarcodeMatch::Prefix(t) => assert_eq!(t.name, "first"),
            _ => panic!("expected prefix match"),
        }
    }

    #[test]
    fn test_no_match() {
        let types = catalog();
        assert!(resolve_barcode("ZZ999", &types).is_no_match());
        assert!(resolve_barcode("", &types).is_no_match());
    }

    #[test]
    fn test_prefix_does_not_match_bulk_scan_partially() {
        // A scan equal to only part of a bulk code is not an exact match
        let types = catalog();
        assert!(resolve_barcode("OV", &types).is_no_match());
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        let types = vec![TestType {
            name: "broken",
            mode: TrackingMode::ItemTracked,
            key: Some(""),
        }];
        assert!(resolve_barcode("ANY", &types).is_no_match());
    }
}
