//! # Calculation Records
//!
//! A saved pricing calculation for one part on one quote.
//!
//! ## Record Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CalculationRecord                                                      │
//! │  ─────────────────                                                      │
//! │  slot:       quoteId + (quotePartId | quoteLineItemId)                  │
//! │  inputs:     toolpathGrandTotal, leadTime*, *ThreadCount, *ThreadRate,  │
//! │              complexity, tolerance, toolingCost, notes                  │
//! │  outputs:    totalThreadCost, toolingMarkup, basePrice,                 │
//! │              adjustedPrice, finalPrice                                  │
//! │  bookkeeping: id, version, createdAt, updatedAt                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each slot holds at most one current record; saving replaces it whole.
//! Re-running the engine on the stored inputs reproduces the stored
//! outputs, which is what lets the calculator pre-fill a revisited part.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::input::lenient_count;
use crate::pricing::{
    PriceBreakdown, PricingConfiguration, PricingRuleEngine, RateTable, ThreadCounts, ThreadRates,
};
use crate::types::{LeadTimeOption, Multiplier};
use crate::validation::{validate_configuration, validate_uuid};

// =============================================================================
// Calculation Key
// =============================================================================

/// Which slot of a quote a calculation occupies.
///
/// A part id wins over a line item id when both are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CalculationKey {
    Part(String),
    LineItem(i64),
}

impl CalculationKey {
    /// Picks the slot, or `MissingPartReference` when neither id is usable.
    pub fn resolve(quote_part_id: Option<&str>, quote_line_item_id: Option<i64>) -> CoreResult<Self> {
        match (quote_part_id.map(str::trim), quote_line_item_id) {
            (Some(part_id), _) if !part_id.is_empty() => Ok(CalculationKey::Part(part_id.to_string())),
            (_, Some(line_item_id)) => Ok(CalculationKey::LineItem(line_item_id)),
            _ => Err(CoreError::MissingPartReference),
        }
    }
}

// =============================================================================
// New Calculation
// =============================================================================

/// A validated calculation that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCalculation {
    pub quote_id: i64,
    pub quote_part_id: Option<String>,
    pub quote_line_item_id: Option<i64>,
    pub configuration: PricingConfiguration,
    pub breakdown: PriceBreakdown,
}

impl NewCalculation {
    /// Prices `configuration` and ties the result to a slot.
    pub fn price(
        quote_id: i64,
        quote_part_id: Option<String>,
        quote_line_item_id: Option<i64>,
        configuration: PricingConfiguration,
    ) -> CoreResult<Self> {
        CalculationKey::resolve(quote_part_id.as_deref(), quote_line_item_id)?;
        let breakdown = PricingRuleEngine::calculate(&configuration);
        Ok(NewCalculation {
            quote_id,
            quote_part_id: quote_part_id.filter(|id| !id.trim().is_empty()),
            quote_line_item_id,
            configuration,
            breakdown,
        })
    }

    pub fn key(&self) -> CoreResult<CalculationKey> {
        CalculationKey::resolve(self.quote_part_id.as_deref(), self.quote_line_item_id)
    }

    /// Builds the stored form once the database has assigned bookkeeping.
    pub fn into_record(
        self,
        id: i64,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> CalculationRecord {
        let config = self.configuration;
        let tooling = config.tooling_enabled;
        CalculationRecord {
            id,
            quote_id: self.quote_id,
            quote_part_id: self.quote_part_id,
            quote_line_item_id: self.quote_line_item_id,
            toolpath_grand_total: config.toolpath_grand_total,
            lead_time_option: config.lead_time_option,
            lead_time_multiplier: config.lead_time_multiplier,
            small_thread_count: config.thread_counts.small,
            small_thread_rate: config.thread_rates.small,
            medium_thread_count: config.thread_counts.medium,
            medium_thread_rate: config.thread_rates.medium,
            large_thread_count: config.thread_counts.large,
            large_thread_rate: config.thread_rates.large,
            total_thread_cost: self.breakdown.thread_cost,
            complexity_multiplier: config.complexity_multiplier,
            tolerance_multiplier: config.tolerance_multiplier,
            tooling_cost: tooling.then_some(config.tooling_cost),
            tooling_markup: tooling.then_some(self.breakdown.tooling_markup),
            base_price: self.breakdown.base_price,
            adjusted_price: self.breakdown.adjusted_price,
            final_price: self.breakdown.final_price,
            notes: config.notes,
            version,
            created_at,
            updated_at,
        }
    }
}

// =============================================================================
// Calculation Record
// =============================================================================

/// The current calculation for one slot of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub id: i64,
    pub quote_id: i64,
    pub quote_part_id: Option<String>,
    pub quote_line_item_id: Option<i64>,
    pub toolpath_grand_total: Money,
    pub lead_time_option: LeadTimeOption,
    pub lead_time_multiplier: Multiplier,
    pub small_thread_count: i64,
    pub small_thread_rate: Money,
    pub medium_thread_count: i64,
    pub medium_thread_rate: Money,
    pub large_thread_count: i64,
    pub large_thread_rate: Money,
    pub total_thread_cost: Money,
    pub complexity_multiplier: Multiplier,
    pub tolerance_multiplier: Multiplier,
    /// `None` when tooling is off.
    pub tooling_cost: Option<Money>,
    pub tooling_markup: Option<Money>,
    pub base_price: Money,
    pub adjusted_price: Money,
    pub final_price: Money,
    pub notes: String,
    /// Starts at 1; every replace bumps it.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CalculationRecord {
    pub fn key(&self) -> CoreResult<CalculationKey> {
        CalculationKey::resolve(self.quote_part_id.as_deref(), self.quote_line_item_id)
    }

    /// The inputs, ready to feed back into the engine.
    pub fn configuration(&self) -> PricingConfiguration {
        PricingConfiguration {
            toolpath_grand_total: self.toolpath_grand_total,
            lead_time_option: self.lead_time_option,
            lead_time_multiplier: self.lead_time_multiplier,
            thread_counts: ThreadCounts {
                small: self.small_thread_count,
                medium: self.medium_thread_count,
                large: self.large_thread_count,
            },
            thread_rates: ThreadRates {
                small: self.small_thread_rate,
                medium: self.medium_thread_rate,
                large: self.large_thread_rate,
            },
            complexity_multiplier: self.complexity_multiplier,
            tolerance_multiplier: self.tolerance_multiplier,
            tooling_enabled: self.tooling_cost.is_some(),
            tooling_cost: self.tooling_cost.unwrap_or_default(),
            notes: self.notes.clone(),
        }
    }

    /// The stored outputs.
    pub fn breakdown(&self) -> PriceBreakdown {
        PriceBreakdown {
            base_price: self.base_price,
            thread_cost: self.total_thread_cost,
            tooling_markup: self.tooling_markup.unwrap_or_default(),
            adjusted_price: self.adjusted_price,
            final_price: self.final_price,
            lead_time_multiplier: self.lead_time_multiplier,
        }
    }

    /// Whether re-running the engine gives back the stored outputs.
    pub fn is_reproducible(&self) -> bool {
        PricingRuleEngine::calculate(&self.configuration()) == self.breakdown()
    }
}

// =============================================================================
// Save Request
// =============================================================================

/// Body of a save-calculation call, as the calculator sends it.
///
/// Derived fields (`totalThreadCost`, `basePrice`, ...) are accepted but
/// never trusted: the engine recomputes them from the inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveCalculationRequest {
    /// Must match the quote in the URL when present.
    pub quote_id: Option<i64>,
    pub quote_part_id: Option<String>,
    pub quote_line_item_id: Option<i64>,
    pub toolpath_grand_total: Money,
    pub lead_time_option: LeadTimeOption,
    pub lead_time_multiplier: Option<Multiplier>,
    #[serde(deserialize_with = "lenient_count")]
    pub small_thread_count: i64,
    pub small_thread_rate: Option<Money>,
    #[serde(deserialize_with = "lenient_count")]
    pub medium_thread_count: i64,
    pub medium_thread_rate: Option<Money>,
    #[serde(deserialize_with = "lenient_count")]
    pub large_thread_count: i64,
    pub large_thread_rate: Option<Money>,
    pub total_thread_cost: Option<Money>,
    pub complexity_multiplier: Option<Multiplier>,
    pub tolerance_multiplier: Option<Multiplier>,
    /// Defaults to "a tooling cost was sent".
    pub tooling_enabled: Option<bool>,
    pub tooling_cost: Option<Money>,
    pub tooling_markup: Option<Money>,
    pub base_price: Option<Money>,
    pub adjusted_price: Option<Money>,
    pub final_price: Option<Money>,
    pub notes: String,
    /// Version the caller loaded; `0` means "no record yet". Omit for
    /// last-write-wins.
    pub expected_version: Option<i64>,
}

impl SaveCalculationRequest {
    /// The inputs, with blanks filled from the rate table.
    pub fn configuration(&self, rates: &RateTable) -> PricingConfiguration {
        let tooling_enabled = self.tooling_enabled.unwrap_or(self.tooling_cost.is_some());
        PricingConfiguration {
            toolpath_grand_total: self.toolpath_grand_total,
            lead_time_option: self.lead_time_option,
            lead_time_multiplier: self
                .lead_time_multiplier
                .unwrap_or_else(|| rates.lead_time.for_option(self.lead_time_option)),
            thread_counts: ThreadCounts {
                small: self.small_thread_count,
                medium: self.medium_thread_count,
                large: self.large_thread_count,
            },
            thread_rates: ThreadRates {
                small: self.small_thread_rate.unwrap_or(rates.thread_rates.small),
                medium: self.medium_thread_rate.unwrap_or(rates.thread_rates.medium),
                large: self.large_thread_rate.unwrap_or(rates.thread_rates.large),
            },
            complexity_multiplier: self
                .complexity_multiplier
                .unwrap_or(rates.complexity.default),
            tolerance_multiplier: self.tolerance_multiplier.unwrap_or(rates.tolerance.default),
            tooling_enabled,
            tooling_cost: if tooling_enabled {
                self.tooling_cost.unwrap_or_default()
            } else {
                Money::zero()
            },
            notes: self.notes.clone(),
        }
    }

    /// Validates and prices the request for `quote_id`.
    ///
    /// ## Workflow
    /// ```text
    /// SaveCalculationRequest
    ///      │
    ///      ├── no part id and no line item id → MissingPartReference
    ///      ├── part id not a UUID             → Validation
    ///      ├── inputs out of bounds           → Validation
    ///      │
    ///      ▼
    /// PricingRuleEngine::calculate → NewCalculation
    /// ```
    pub fn into_new_calculation(self, quote_id: i64, rates: &RateTable) -> CoreResult<NewCalculation> {
        let key = CalculationKey::resolve(self.quote_part_id.as_deref(), self.quote_line_item_id)?;
        if let CalculationKey::Part(part_id) = &key {
            validate_uuid(part_id)?;
        }

        let configuration = self.configuration(rates);
        validate_configuration(&configuration, rates)?;

        NewCalculation::price(
            quote_id,
            self.quote_part_id,
            self.quote_line_item_id,
            configuration,
        )
    }

    /// Names of submitted derived fields that disagree with `breakdown`.
    pub fn derived_mismatches(&self, breakdown: &PriceBreakdown) -> Vec<&'static str> {
        let tooling_markup = if self.tooling_markup.is_some() {
            Some(breakdown.tooling_markup)
        } else {
            None
        };

        [
            ("totalThreadCost", self.total_thread_cost, Some(breakdown.thread_cost)),
            ("toolingMarkup", self.tooling_markup, tooling_markup),
            ("basePrice", self.base_price, Some(breakdown.base_price)),
            ("adjustedPrice", self.adjusted_price, Some(breakdown.adjusted_price)),
            ("finalPrice", self.final_price, Some(breakdown.final_price)),
        ]
        .into_iter()
        .filter_map(|(field, submitted, computed)| match submitted {
            Some(value) if Some(value) != computed => Some(field),
            _ => None,
        })
        .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PART_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn scenario_request() -> SaveCalculationRequest {
        SaveCalculationRequest {
            quote_part_id: Some(PART_ID.to_string()),
            quote_line_item_id: Some(7),
            toolpath_grand_total: Money::new(dec!(100)),
            lead_time_multiplier: Some(Multiplier::new(dec!(1.0))),
            small_thread_count: 2,
            small_thread_rate: Some(Money::new(dec!(0.90))),
            complexity_multiplier: Some(Multiplier::new(dec!(2.15))),
            tolerance_multiplier: Some(Multiplier::new(dec!(1.0))),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_prefers_part() {
        assert_eq!(
            CalculationKey::resolve(Some("abc"), Some(3)).unwrap(),
            CalculationKey::Part("abc".to_string())
        );
        assert_eq!(
            CalculationKey::resolve(Some("  "), Some(3)).unwrap(),
            CalculationKey::LineItem(3)
        );
        assert!(matches!(
            CalculationKey::resolve(None, None),
            Err(CoreError::MissingPartReference)
        ));
    }

    #[test]
    fn test_request_prices_with_engine() {
        let new = scenario_request()
            .into_new_calculation(1, &RateTable::default())
            .unwrap();
        assert_eq!(new.breakdown.final_price, Money::new(dec!(218.87)));
        assert_eq!(new.key().unwrap(), CalculationKey::Part(PART_ID.to_string()));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let request = SaveCalculationRequest {
            quote_part_id: None,
            quote_line_item_id: None,
            ..scenario_request()
        };
        let err = request
            .into_new_calculation(1, &RateTable::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingPartReference));
    }

    #[test]
    fn test_out_of_range_rejected_before_pricing() {
        let request = SaveCalculationRequest {
            complexity_multiplier: Some(Multiplier::new(dec!(5))),
            ..scenario_request()
        };
        let err = request
            .into_new_calculation(1, &RateTable::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_round_trip_reproduces_final_price() {
        let mut request = scenario_request();
        request.tooling_cost = Some(Money::new(dec!(50)));
        let new = request
            .into_new_calculation(1, &RateTable::default())
            .unwrap();
        let expected = new.breakdown;

        let record = new.into_record(10, 1, Utc::now(), Utc::now());
        assert!(record.is_reproducible());
        assert_eq!(record.tooling_markup, Some(Money::new(dec!(75))));
        assert_eq!(
            PricingRuleEngine::calculate(&record.configuration()).final_price,
            expected.final_price
        );
    }

    #[test]
    fn test_tooling_off_stores_nulls() {
        let record = scenario_request()
            .into_new_calculation(1, &RateTable::default())
            .unwrap()
            .into_record(1, 1, Utc::now(), Utc::now());
        assert_eq!(record.tooling_cost, None);
        assert_eq!(record.tooling_markup, None);
        assert!(!record.configuration().tooling_enabled);
    }

    #[test]
    fn test_explicitly_disabled_tooling_ignores_cost() {
        let request = SaveCalculationRequest {
            tooling_enabled: Some(false),
            tooling_cost: Some(Money::new(dec!(50))),
            ..scenario_request()
        };
        let config = request.configuration(&RateTable::default());
        assert!(!config.tooling_enabled);
        assert_eq!(config.tooling_cost, Money::zero());
    }

    #[test]
    fn test_derived_mismatches() {
        let request = SaveCalculationRequest {
            base_price: Some(Money::new(dec!(101.80))),
            final_price: Some(Money::new(dec!(999))),
            ..scenario_request()
        };
        let breakdown = PricingRuleEngine::calculate(&request.configuration(&RateTable::default()));
        assert_eq!(request.derived_mismatches(&breakdown), vec!["finalPrice"]);
    }

    #[test]
    fn test_request_deserializes_wire_shape() {
        let request: SaveCalculationRequest = serde_json::from_value(serde_json::json!({
            "quoteId": 1,
            "quotePartId": PART_ID,
            "quoteLineItemId": null,
            "toolpathGrandTotal": "100",
            "leadTimeOption": "fast",
            "leadTimeMultiplier": "2.0",
            "smallThreadCount": 0,
            "smallThreadRate": "0.90",
            "mediumThreadCount": 0,
            "mediumThreadRate": "1.25",
            "largeThreadCount": 0,
            "largeThreadRate": "1.75",
            "totalThreadCost": "0",
            "complexityMultiplier": "2.15",
            "toleranceMultiplier": "1.0",
            "toolingCost": null,
            "toolingMarkup": null,
            "basePrice": "100",
            "adjustedPrice": "430",
            "finalPrice": "430",
            "notes": "rush job"
        }))
        .unwrap();

        let new = request
            .into_new_calculation(1, &RateTable::default())
            .unwrap();
        assert_eq!(new.configuration.lead_time_option, LeadTimeOption::Fast);
        assert_eq!(new.breakdown.final_price, Money::new(dec!(430)));
        assert_eq!(new.configuration.notes, "rush job");
    }

    #[test]
    fn test_blank_thread_counts_read_as_zero() {
        let request: SaveCalculationRequest = serde_json::from_value(serde_json::json!({
            "quotePartId": PART_ID,
            "toolpathGrandTotal": "100",
            "smallThreadCount": "",
            "mediumThreadCount": null,
            "largeThreadCount": "3"
        }))
        .unwrap();

        assert_eq!(request.small_thread_count, 0);
        assert_eq!(request.medium_thread_count, 0);
        assert_eq!(request.large_thread_count, 3);

        let new = request
            .into_new_calculation(1, &RateTable::default())
            .unwrap();
        assert_eq!(new.breakdown.thread_cost, Money::new(dec!(5.25)));
    }
}
