//! # Error Types
//!
//! Domain-specific error types for lathe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lathe-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lathe-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  lathe-server errors (in app)                                          │
//! │  └── ApiError         - What the client sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (quote ID, field name, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. The pricing engine
/// itself never produces one; they come from the rules around it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Quote not found: {0}")]
    QuoteNotFound(i64),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Line item not found: {0}")]
    LineItemNotFound(i64),

    /// Quote is past the point where pricing may change.
    ///
    /// ## When This Occurs
    /// - Saving a calculation on a quote that has been sent
    /// - Editing a line item on an accepted quote
    ///
    /// ## User Workflow
    /// ```text
    /// Calculator: Save Part 2 of 3
    ///      │
    ///      ▼
    /// Quote status: sent
    ///      │
    ///      ▼
    /// QuoteLocked { quote_id: 42, status: "sent" }
    ///      │
    ///      ▼
    /// UI stays on Part 2 with the entered values intact
    /// ```
    #[error("Quote {quote_id} is {status} and can no longer be edited")]
    QuoteLocked { quote_id: i64, status: String },

    /// Lifecycle action not allowed from the current status.
    #[error("Cannot {action} a quote that is {from}")]
    InvalidStatusTransition { from: String, action: String },

    /// A calculation must be keyed by a part or a line item.
    #[error("A calculation must reference a part or a line item")]
    MissingPartReference,

    /// The line item is priced by a different part of the quote.
    #[error("Line item {line_item_id} belongs to another part than {part_id}")]
    LineItemPartMismatch { line_item_id: i64, part_id: String },

    /// Optimistic version check failed.
    ///
    /// ## When This Occurs
    /// - Two estimators price the same part; the second save carries the
    ///   version it loaded, which no longer matches
    #[error("Calculation was changed by someone else (expected version {expected}, found {actual})")]
    StaleCalculation { expected: i64, actual: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything is persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity or price the user typed cannot be used.
    #[error("Please enter a valid {field}")]
    InvalidAmount { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: Decimal,
        max: Decimal,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuoteLocked {
            quote_id: 42,
            status: "sent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Quote 42 is sent and can no longer be edited"
        );

        let err = CoreError::StaleCalculation {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Calculation was changed by someone else (expected version 2, found 3)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InvalidAmount {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "Please enter a valid quantity");

        let err = ValidationError::OutOfRange {
            field: "complexityMultiplier".to_string(),
            min: dec!(1.15),
            max: dec!(3.15),
        };
        assert_eq!(
            err.to_string(),
            "complexityMultiplier must be between 1.15 and 3.15"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
