//! # Pricing
//!
//! The quote pricing rules, split by concern:
//!
//! - [`engine`] - `PricingRuleEngine`, configuration and breakdown types
//! - [`rates`] - `RateTable` handed to every engine call
//! - [`tolerance`] - default tolerance multiplier from part tolerance
//! - [`input`] - lenient coercion of raw calculator form values
//!
//! ## Data Flow
//! ```text
//! PricingInput (raw) ──into_configuration(&RateTable)──► PricingConfiguration
//!                                                              │
//!                                      PricingRuleEngine::calculate
//!                                                              │
//!                                                              ▼
//!                                                       PriceBreakdown
//! ```

pub mod engine;
pub mod input;
pub mod rates;
pub mod tolerance;

pub use engine::{
    PriceBreakdown, PricingConfiguration, PricingRuleEngine, ThreadCounts, TOOLING_MARKUP_FACTOR,
};
pub use input::PricingInput;
pub use rates::{LeadTimeMultipliers, MultiplierRange, RateTable, ThreadRates, ThreadSize};
pub use tolerance::{default_tolerance_multiplier, parse_tolerance, suggest_tolerance_multiplier};
