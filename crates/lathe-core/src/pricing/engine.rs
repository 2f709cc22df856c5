//! # Pricing Rule Engine
//!
//! Turns one part's shop-floor inputs into a price breakdown.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. threadCost    = Σ count[size] × rate[size]      (small/medium/large)│
//! │  2. toolingMarkup = toolingEnabled ? toolingCost × 1.5 : 0              │
//! │  3. basePrice     = toolpathGrandTotal + threadCost                     │
//! │  4. adjustedPrice = basePrice × leadTime × complexity × tolerance       │
//! │  5. finalPrice    = adjustedPrice + toolingMarkup                       │
//! │                                                                         │
//! │  Tooling is a one-off charge: it is marked up, but never multiplied by │
//! │  lead time, complexity or tolerance.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is total: it never returns an error, never panics and never
//! produces a non-number. Negative thread counts count as zero and overflow
//! saturates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::rates::{RateTable, ThreadRates, ThreadSize};
use crate::types::{LeadTimeOption, Multiplier};

/// Markup applied to tooling cost (×1.5).
pub const TOOLING_MARKUP_FACTOR: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

// =============================================================================
// Inputs
// =============================================================================

/// Number of tapped holes per size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCounts {
    pub small: i64,
    pub medium: i64,
    pub large: i64,
}

impl ThreadCounts {
    pub fn get(&self, size: ThreadSize) -> i64 {
        match size {
            ThreadSize::Small => self.small,
            ThreadSize::Medium => self.medium,
            ThreadSize::Large => self.large,
        }
    }
}

/// Everything an estimator enters for one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfiguration {
    /// Machining cost from the CAM toolpath estimate.
    pub toolpath_grand_total: Money,
    pub lead_time_option: LeadTimeOption,
    /// Starts at the option's default, then edited independently.
    pub lead_time_multiplier: Multiplier,
    pub thread_counts: ThreadCounts,
    pub thread_rates: ThreadRates,
    pub complexity_multiplier: Multiplier,
    pub tolerance_multiplier: Multiplier,
    pub tooling_enabled: bool,
    /// Ignored unless `tooling_enabled`.
    pub tooling_cost: Money,
    pub notes: String,
}

impl PricingConfiguration {
    /// A blank configuration for a part that has never been priced.
    pub fn defaults(rates: &RateTable) -> Self {
        let lead_time_option = LeadTimeOption::default();
        PricingConfiguration {
            toolpath_grand_total: Money::zero(),
            lead_time_option,
            lead_time_multiplier: rates.lead_time.for_option(lead_time_option),
            thread_counts: ThreadCounts::default(),
            thread_rates: rates.thread_rates,
            complexity_multiplier: rates.complexity.default,
            tolerance_multiplier: rates.tolerance.default,
            tooling_enabled: false,
            tooling_cost: Money::zero(),
            notes: String::new(),
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// The engine's result. All amounts are exact; rounding happens downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: Money,
    pub thread_cost: Money,
    pub tooling_markup: Money,
    pub adjusted_price: Money,
    pub final_price: Money,
    pub lead_time_multiplier: Multiplier,
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless pricing rules.
pub struct PricingRuleEngine;

impl PricingRuleEngine {
    /// Prices one part.
    ///
    /// ## Example
    /// ```rust
    /// use lathe_core::pricing::{PricingConfiguration, PricingRuleEngine, RateTable};
    /// use lathe_core::{Money, Multiplier};
    /// use rust_decimal::Decimal;
    ///
    /// let mut config = PricingConfiguration::defaults(&RateTable::default());
    /// config.toolpath_grand_total = Money::new(Decimal::new(100, 0));
    ///
    /// let breakdown = PricingRuleEngine::calculate(&config);
    /// assert_eq!(breakdown.final_price, Money::new(Decimal::new(215, 0)));
    /// ```
    pub fn calculate(config: &PricingConfiguration) -> PriceBreakdown {
        let thread_cost = Self::thread_cost(&config.thread_counts, &config.thread_rates);
        let tooling_markup = Self::tooling_markup(config.tooling_enabled, config.tooling_cost);
        let base_price = config.toolpath_grand_total + thread_cost;

        let adjusted_price = base_price
            .scale(config.lead_time_multiplier.value())
            .scale(config.complexity_multiplier.value())
            .scale(config.tolerance_multiplier.value());

        PriceBreakdown {
            base_price,
            thread_cost,
            tooling_markup,
            adjusted_price,
            final_price: adjusted_price + tooling_markup,
            lead_time_multiplier: config.lead_time_multiplier,
        }
    }

    /// `Σ count × rate`. Negative counts count as zero.
    pub fn thread_cost(counts: &ThreadCounts, rates: &ThreadRates) -> Money {
        ThreadSize::ALL
            .iter()
            .map(|&size| rates.get(size).multiply_quantity(counts.get(size).max(0)))
            .sum()
    }

    pub fn tooling_markup(enabled: bool, cost: Money) -> Money {
        if enabled {
            cost.scale(TOOLING_MARKUP_FACTOR)
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
