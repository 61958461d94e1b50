//! Validation utilities for the Hospital Supply Tracking Platform

use chrono::NaiveDate;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate an import or distribution quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a scanned barcode
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.trim().is_empty() {
        return Err("Barcode must not be empty");
    }
    Ok(())
}

/// Validate a lot number for lot-tracked stock
pub fn validate_lot_number(lot_number: &str) -> Result<(), &'static str> {
    if lot_number.trim().is_empty() {
        return Err("Lot number must not be empty");
    }
    Ok(())
}

/// Validate an expiry date against the current date.
///
/// Imports of already-expired stock are rejected; `today` is injected so the
/// check stays deterministic under test.
pub fn validate_expiry_date(expiry: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if expiry < today {
        return Err("Expiry date has already passed");
    }
    Ok(())
}

/// Validate a recipient name supplied with a distribution
pub fn validate_recipient_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Recipient name must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(50).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_barcode_not_empty() {
        assert!(validate_barcode("AR1234567").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("   ").is_err());
    }

    #[test]
    fn test_expiry_date_not_in_past() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(validate_expiry_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), today).is_ok());
        assert!(validate_expiry_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), today).is_ok());
        assert!(validate_expiry_date(NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(), today).is_err());
    }

    #[test]
    fn test_lot_number_and_recipient() {
        assert!(validate_lot_number("L1").is_ok());
        assert!(validate_lot_number(" ").is_err());
        assert!(validate_recipient_name("Nguyen Van A").is_ok());
        assert!(validate_recipient_name("").is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_quantity_accepts_exactly_positive(q in any::<i32>()) {
                prop_assert_eq!(validate_quantity(q).is_ok(), q > 0);
            }
        }
    }
}
