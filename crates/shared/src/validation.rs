//! Common validation utilities.

use validator::ValidationError;

/// Maximum item quantity accepted from clients.
pub const MAX_ITEM_QUANTITY: i32 = 10_000;

/// Validates that an item quantity is at least 1.
pub fn validate_quantity(quantity: i32) -> Result<(), ValidationError> {
    if (1..=MAX_ITEM_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        let mut err = ValidationError::new("quantity_range");
        err.message = Some("Quantity must be between 1 and 10000".into());
        Err(err)
    }
}

/// Validates a purchased quantity against the item quantity.
///
/// When set, the purchased quantity must satisfy `0 < purchased <= quantity`.
pub fn validate_purchased_quantity(
    purchased: i32,
    quantity: i32,
) -> Result<(), ValidationError> {
    if purchased >= 1 && purchased <= quantity {
        Ok(())
    } else {
        let mut err = ValidationError::new("purchased_quantity_range");
        err.message =
            Some("Purchased quantity must be positive and at most the item quantity".into());
        Err(err)
    }
}

/// Validates a UI color as a `#RRGGBB` hex code.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("hex_color");
        err.message = Some("Color must be a #RRGGBB hex code".into());
        Err(err)
    }
}

/// Validates that a name is non-empty after trimming.
pub fn validate_trimmed_non_empty(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Normalizes an item name for purchase-history matching.
///
/// Matching is a trimmed, case-insensitive exact match; no fuzzy matching.
pub fn normalize_item_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(10_001).is_err());
    }

    #[test]
    fn test_validate_purchased_quantity() {
        assert!(validate_purchased_quantity(1, 5).is_ok());
        assert!(validate_purchased_quantity(5, 5).is_ok());
        assert!(validate_purchased_quantity(0, 5).is_err());
        assert!(validate_purchased_quantity(6, 5).is_err());
        assert!(validate_purchased_quantity(-1, 5).is_err());
    }

    #[test]
    fn test_validate_hex_color() {
        assert!(validate_hex_color("#00ff88").is_ok());
        assert!(validate_hex_color("#AABBCC").is_ok());
        assert!(validate_hex_color("00ff88").is_err());
        assert!(validate_hex_color("#00ff8").is_err());
        assert!(validate_hex_color("#00ff8z").is_err());
    }

    #[test]
    fn test_validate_trimmed_non_empty() {
        assert!(validate_trimmed_non_empty("Milk").is_ok());
        assert!(validate_trimmed_non_empty("  ").is_err());
        assert!(validate_trimmed_non_empty("").is_err());
    }

    #[test]
    fn test_normalize_item_name() {
        assert_eq!(normalize_item_name("  Milk "), "milk");
        assert_eq!(normalize_item_name("OAT milk"), "oat milk");
        assert_eq!(normalize_item_name("milk"), normalize_item_name("MILK"));
    }
}
