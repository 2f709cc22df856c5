//! # lathe-core: Pure Business Logic for Lathe Quote Pricing
//!
//! This crate is the **heart** of Lathe. It contains the quote pricing rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lathe Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Quoting UI                                   │   │
//! │  │    Quote ──► Calculator (part by part) ──► Totals              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lathe-server (axum)                          │   │
//! │  │    save_calculation, recompute_total, calculator_session, ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lathe-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │calculation│  │calculator │  │ validation│  │   │
//! │  │   │  Engine   │  │  Record   │  │  Session  │  │   rules   │  │   │
//! │  │   │ RateTable │  │  Request  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lathe-db (Database Layer)                    │   │
//! │  │       SQLite queries, migrations, repositories, aggregator      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Quote, QuotePart, QuoteLineItem, statuses)
//! - [`money`] - Exact decimal Money (no floating point!)
//! - [`pricing`] - Pricing rule engine, rate tables, tolerance defaults
//! - [`calculation`] - Stored calculation records and the save request
//! - [`calculator`] - Part-by-part calculator session projection
//! - [`totals`] - Quote total from line items
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, so a stored calculation
//!    always reproduces its price
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Exact Money**: base-10 decimals, rounded to cents only on line items
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use lathe_core::pricing::{PricingConfiguration, PricingRuleEngine, RateTable};
//! use lathe_core::{Money, Multiplier};
//! use rust_decimal::Decimal;
//!
//! let rates = RateTable::default();
//! let mut config = PricingConfiguration::defaults(&rates);
//! config.toolpath_grand_total = Money::new(Decimal::new(100, 0));
//! config.thread_counts.small = 2;
//!
//! // (100 + 2 × 0.90) × 1.0 × 2.15 × 1.0
//! let breakdown = PricingRuleEngine::calculate(&config);
//! assert_eq!(breakdown.final_price.to_string(), "$218.87");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculation;
pub mod calculator;
pub mod error;
pub mod money;
pub mod pricing;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculation::{CalculationKey, CalculationRecord, NewCalculation, SaveCalculationRequest};
pub use calculator::{CalculatorEntry, CalculatorSession, ConfigurationSource};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single line item
///
/// ## Business Reason
/// Catches typos like 100000 for 1000 before they inflate a quote total.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Maximum length of names (quote number, customer, part, line item).
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of calculation notes.
pub const MAX_NOTES_LENGTH: usize = 4_000;
