//! # Validation Module
//!
//! Input validation for values that are about to be persisted.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Calculator UI                                                │
//! │  ├── Lenient coercion while typing (pricing::input)                    │
//! │  └── Live preview, never rejects                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Save boundary (server)                                       │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: quantity, price, multiplier bounds                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE calculation slot per part                                  │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use lathe_core::validation::{validate_quantity, validate_price};
//! use lathe_core::Money;
//!
//! validate_quantity(5).unwrap();
//! validate_price(Money::from_cents(21887)).unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::{MultiplierRange, PricingConfiguration, RateTable, ThreadSize};
use crate::types::Multiplier;
use crate::{MAX_LINE_QUANTITY, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (quote number, customer, part, line item).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `MAX_NAME_LENGTH` characters
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates calculation notes. Empty is fine.
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use lathe_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Quote: Edit Line Item                                                  │
/// │                                                                         │
/// │  User enters quantity: 0                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → "Please enter a valid quantity"                  │
/// │       │                                                                 │
/// │       └── OK → line item saved, quote total recomputed                 │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::InvalidAmount {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: Decimal::ONE,
            max: Decimal::from(MAX_LINE_QUANTITY),
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (no-charge lines)
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::InvalidAmount {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Rejects negative money amounts.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a multiplier against an inclusive range.
pub fn validate_multiplier(
    field: &str,
    value: Multiplier,
    range: &MultiplierRange,
) -> ValidationResult<()> {
    if !range.contains(value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: range.min.value(),
            max: range.max.value(),
        });
    }

    Ok(())
}

// =============================================================================
// Configuration Validator
// =============================================================================

/// Validates a full pricing configuration before it is saved.
///
/// ## Rules
/// - Toolpath total, thread rates, tooling cost: >= 0
/// - Thread counts: >= 0
/// - Lead time multiplier: > 0
/// - Complexity and tolerance: inside the rate table's ranges
/// - Notes: at most `MAX_NOTES_LENGTH` characters
pub fn validate_configuration(
    config: &PricingConfiguration,
    rates: &RateTable,
) -> ValidationResult<()> {
    validate_non_negative("toolpathGrandTotal", config.toolpath_grand_total)?;

    if config.lead_time_multiplier.value() <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "leadTimeMultiplier".to_string(),
        });
    }

    for size in ThreadSize::ALL {
        if config.thread_counts.get(size) < 0 {
            return Err(ValidationError::Negative {
                field: format!("{}ThreadCount", size.as_str()),
            });
        }
        validate_non_negative(
            &format!("{}ThreadRate", size.as_str()),
            config.thread_rates.get(size),
        )?;
    }

    validate_multiplier(
        "complexityMultiplier",
        config.complexity_multiplier,
        &rates.complexity,
    )?;
    validate_multiplier(
        "toleranceMultiplier",
        config.tolerance_multiplier,
        &rates.tolerance,
    )?;

    validate_non_negative("toolingCost", config.tooling_cost)?;
    validate_notes(&config.notes)?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Bracket, 6061-T6").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(250).is_ok());

        let err = validate_quantity(0).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid quantity");
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::new(dec!(218.87))).is_ok());

        let err = validate_price(Money::new(dec!(-0.01))).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid price");
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_validate_configuration_accepts_defaults() {
        let rates = RateTable::default();
        let config = PricingConfiguration::defaults(&rates);
        assert!(validate_configuration(&config, &rates).is_ok());
    }

    #[test]
    fn test_validate_configuration_bounds() {
        let rates = RateTable::default();

        let mut config = PricingConfiguration::defaults(&rates);
        config.complexity_multiplier = Multiplier::new(dec!(3.5));
        let err = validate_configuration(&config, &rates).unwrap_err();
        assert_eq!(
            err.to_string(),
            "complexityMultiplier must be between 1.15 and 3.15"
        );

        let mut config = PricingConfiguration::defaults(&rates);
        config.tolerance_multiplier = Multiplier::new(dec!(0.5));
        assert!(validate_configuration(&config, &rates).is_err());

        let mut config = PricingConfiguration::defaults(&rates);
        config.lead_time_multiplier = Multiplier::new(Decimal::ZERO);
        assert!(matches!(
            validate_configuration(&config, &rates),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_configuration_negative_inputs() {
        let rates = RateTable::default();

        let mut config = PricingConfiguration::defaults(&rates);
        config.thread_counts.large = -1;
        assert!(validate_configuration(&config, &rates).is_err());

        let mut config = PricingConfiguration::defaults(&rates);
        config.tooling_cost = Money::new(dec!(-5));
        assert!(validate_configuration(&config, &rates).is_err());

        let mut config = PricingConfiguration::defaults(&rates);
        config.notes = "x".repeat(MAX_NOTES_LENGTH + 1);
        assert!(validate_configuration(&config, &rates).is_err());
    }
}
