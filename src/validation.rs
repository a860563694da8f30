//! Input validation for transition requests
//!
//! Validation runs before any transaction opens: a request that fails here
//! never touches the database. Quantities and identifiers are checked at
//! the boundary so the engine can assume well-formed inputs.

use std::fmt;

use crate::core_types::OrgId;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid quantity: must be positive, got {got}")]
    NonPositiveQuantity { got: i64 },

    #[error("Invalid quantity: {got} exceeds the per-operation cap of {max}")]
    QuantityTooLarge { got: i64, max: i64 },

    #[error("Invalid identifier for {field}: must be positive, got {got}")]
    InvalidIdentifier { field: &'static str, got: i64 },

    #[error("Invalid {field}: must not be empty")]
    EmptyField { field: &'static str },

    #[error("Invalid {field}: exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Request must contain at least one line item")]
    NoLineItems,

    #[error("Invalid date range: expiry must be after manufacture date")]
    ExpiryBeforeManufacture,
}

// ============================================================================
// Validated Quantity (Private Field)
// ============================================================================

/// Largest unit count one operation may touch. Bounds transaction size and
/// lock footprint.
pub const MAX_QUANTITY: i64 = 100_000;

/// Validated positive quantity
///
/// Field is private to force validation through `new()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity(u32);

impl Quantity {
    /// Create a validated quantity (1..=MAX_QUANTITY)
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveQuantity { got: value });
        }
        if value > MAX_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                got: value,
                max: MAX_QUANTITY,
            });
        }
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Require a positive entity identifier
pub fn require_id(field: &'static str, value: i64) -> Result<OrgId, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::InvalidIdentifier { field, got: value });
    }
    Ok(value)
}

/// Require a non-empty, bounded free-text field (recall reasons etc.)
pub fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if value.len() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_rejects_zero_and_negative() {
        assert_eq!(
            Quantity::new(0),
            Err(ValidationError::NonPositiveQuantity { got: 0 })
        );
        assert_eq!(
            Quantity::new(-5),
            Err(ValidationError::NonPositiveQuantity { got: -5 })
        );
    }

    #[test]
    fn quantity_rejects_oversize() {
        assert!(Quantity::new(MAX_QUANTITY).is_ok());
        assert_eq!(
            Quantity::new(MAX_QUANTITY + 1),
            Err(ValidationError::QuantityTooLarge {
                got: MAX_QUANTITY + 1,
                max: MAX_QUANTITY
            })
        );
    }

    #[test]
    fn quantity_accepts_positive() {
        assert_eq!(Quantity::new(60).unwrap().get(), 60);
    }

    #[test]
    fn require_id_rejects_non_positive() {
        assert!(require_id("manufacturer_id", 1).is_ok());
        assert!(require_id("manufacturer_id", 0).is_err());
        assert!(require_id("manufacturer_id", -1).is_err());
    }

    #[test]
    fn require_text_trims_and_bounds() {
        assert_eq!(require_text("reason", "  wrong destination ", 64).unwrap(), "wrong destination");
        assert!(require_text("reason", "   ", 64).is_err());
        assert!(require_text("reason", &"x".repeat(65), 64).is_err());
    }
}
