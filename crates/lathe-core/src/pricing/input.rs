//! # Lenient Pricing Input
//!
//! Raw form values as the calculator sends them while the estimator is
//! still typing: numbers, numeric strings, blanks and nulls all arrive.
//! [`PricingInput::into_configuration`] turns them into a usable
//! [`PricingConfiguration`] without ever failing.
//!
//! ## Coercion Rules
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Field                        │ blank / unreadable / negative            │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ toolpathGrandTotal, tooling  │ 0                                        │
//! │ thread counts                │ 0 (fractions truncate: 2.9 → 2)          │
//! │ thread rates                 │ rate table default (negative → 0)        │
//! │ lead time multiplier         │ default for the lead time option         │
//! │ complexity multiplier        │ range default, else clamped into range   │
//! │ tolerance multiplier         │ suggestion from part tolerance, else 1.0 │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::money::Money;
use crate::pricing::engine::{PricingConfiguration, ThreadCounts};
use crate::pricing::rates::{RateTable, ThreadRates};
use crate::pricing::tolerance::suggest_tolerance_multiplier;
use crate::types::{LeadTimeOption, Multiplier};

/// Per-size raw values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawThreadValues {
    pub small: Value,
    pub medium: Value,
    pub large: Value,
}

/// Unvalidated calculator form state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingInput {
    pub toolpath_grand_total: Value,
    pub lead_time_option: Value,
    pub lead_time_multiplier: Value,
    pub thread_counts: RawThreadValues,
    pub thread_rates: RawThreadValues,
    pub complexity_multiplier: Value,
    pub tolerance_multiplier: Value,
    pub tooling_enabled: Value,
    pub tooling_cost: Value,
    pub notes: Option<String>,
    /// The part's own tolerance text, used to suggest a multiplier.
    pub part_tolerance: Option<String>,
}

impl PricingInput {
    /// Coerces every field. Never fails.
    pub fn into_configuration(self, rates: &RateTable) -> PricingConfiguration {
        let lead_time_option = match &self.lead_time_option {
            Value::String(s) => LeadTimeOption::from_str(s).unwrap_or_default(),
            _ => LeadTimeOption::default(),
        };

        let lead_time_multiplier = coerce_decimal(&self.lead_time_multiplier)
            .filter(|m| *m > Decimal::ZERO)
            .map(Multiplier::new)
            .unwrap_or_else(|| rates.lead_time.for_option(lead_time_option));

        let complexity_multiplier = coerce_decimal(&self.complexity_multiplier)
            .map(|m| rates.complexity.clamp(Multiplier::new(m)))
            .unwrap_or(rates.complexity.default);

        let tolerance_multiplier = coerce_decimal(&self.tolerance_multiplier)
            .map(|m| rates.tolerance.clamp(Multiplier::new(m)))
            .or_else(|| suggest_tolerance_multiplier(self.part_tolerance.as_deref()))
            .unwrap_or(rates.tolerance.default);

        PricingConfiguration {
            toolpath_grand_total: coerce_amount(&self.toolpath_grand_total),
            lead_time_option,
            lead_time_multiplier,
            thread_counts: ThreadCounts {
                small: coerce_count(&self.thread_counts.small),
                medium: coerce_count(&self.thread_counts.medium),
                large: coerce_count(&self.thread_counts.large),
            },
            thread_rates: ThreadRates {
                small: coerce_rate(&self.thread_rates.small, rates.thread_rates.small),
                medium: coerce_rate(&self.thread_rates.medium, rates.thread_rates.medium),
                large: coerce_rate(&self.thread_rates.large, rates.thread_rates.large),
            },
            complexity_multiplier,
            tolerance_multiplier,
            tooling_enabled: coerce_bool(&self.tooling_enabled),
            tooling_cost: coerce_amount(&self.tooling_cost),
            notes: self.notes.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Coercion Helpers
// =============================================================================

/// Reads a decimal from a JSON number or a numeric string such as
/// `"$1,250.00"`. Anything else is `None`.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .ok()
        }
        _ => None,
    }
}

/// Money amount; blank, unreadable or negative becomes zero.
pub fn coerce_amount(value: &Value) -> Money {
    coerce_decimal(value)
        .filter(|d| !d.is_sign_negative())
        .map(Money::new)
        .unwrap_or_default()
}

/// Whole count truncated toward zero; blank, unreadable or negative
/// becomes zero.
pub fn coerce_count(value: &Value) -> i64 {
    coerce_decimal(value)
        .and_then(|d| d.trunc().to_i64())
        .map(|n| n.max(0))
        .unwrap_or(0)
}

/// [`coerce_count`] for `#[serde(deserialize_with)]` fields, so a blank
/// count in a save request reads as zero instead of failing the body.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| coerce_count(&value))
}

fn coerce_rate(value: &Value, fallback: Money) -> Money {
    match coerce_decimal(value) {
        Some(d) if d.is_sign_negative() => Money::zero(),
        Some(d) => Money::new(d),
        None => fallback,
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::engine::PricingRuleEngine;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce_decimal(&json!(100)), Some(dec!(100)));
        assert_eq!(coerce_decimal(&json!(0.9)), Some(dec!(0.9)));
        assert_eq!(coerce_decimal(&json!("101.80")), Some(dec!(101.80)));
        assert_eq!(coerce_decimal(&json!(" $1,250.50 ")), Some(dec!(1250.50)));
        assert_eq!(coerce_decimal(&json!("")), None);
        assert_eq!(coerce_decimal(&json!("abc")), None);
        assert_eq!(coerce_decimal(&Value::Null), None);
        assert_eq!(coerce_decimal(&json!(true)), None);
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(&json!(3)), 3);
        assert_eq!(coerce_count(&json!("2.9")), 2);
        assert_eq!(coerce_count(&json!(-4)), 0);
        assert_eq!(coerce_count(&json!("lots")), 0);
        assert_eq!(coerce_count(&Value::Null), 0);
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(&json!("50")), Money::new(dec!(50)));
        assert_eq!(coerce_amount(&json!(-50)), Money::zero());
        assert_eq!(coerce_amount(&json!("n/a")), Money::zero());
    }

    #[test]
    fn test_blank_form_uses_defaults() {
        let rates = RateTable::default();
        let config = PricingInput::default().into_configuration(&rates);
        assert_eq!(config, PricingConfiguration::defaults(&rates));
    }

    #[test]
    fn test_string_form_prices_like_typed_form() {
        let input: PricingInput = serde_json::from_value(json!({
            "toolpathGrandTotal": "100",
            "leadTimeMultiplier": "1.0",
            "threadCounts": { "small": "2" },
            "threadRates": { "small": "0.90" },
            "complexityMultiplier": 2.15,
            "toleranceMultiplier": "",
            "toolingEnabled": true,
            "toolingCost": "50"
        }))
        .unwrap();

        let config = input.into_configuration(&RateTable::default());
        let result = PricingRuleEngine::calculate(&config);
        assert_eq!(result.final_price, Money::new(dec!(293.87)));
    }

    #[test]
    fn test_lead_time_option_drives_default_multiplier() {
        let input: PricingInput =
            serde_json::from_value(json!({ "leadTimeOption": "fast" })).unwrap();
        let config = input.into_configuration(&RateTable::default());
        assert_eq!(config.lead_time_option, LeadTimeOption::Fast);
        assert_eq!(config.lead_time_multiplier.value(), dec!(2));
    }

    #[test]
    fn test_out_of_range_multipliers_are_clamped() {
        let input: PricingInput = serde_json::from_value(json!({
            "complexityMultiplier": "9",
            "toleranceMultiplier": 0.1
        }))
        .unwrap();
        let config = input.into_configuration(&RateTable::default());
        assert_eq!(config.complexity_multiplier.value(), dec!(3.15));
        assert_eq!(config.tolerance_multiplier.value(), dec!(0.75));
    }

    #[test]
    fn test_part_tolerance_suggests_multiplier() {
        let input = PricingInput {
            part_tolerance: Some("±0.002".to_string()),
            ..Default::default()
        };
        let config = input.into_configuration(&RateTable::default());
        assert_eq!(config.tolerance_multiplier.value(), dec!(1.5));
    }

    #[test]
    fn test_explicit_tolerance_beats_suggestion() {
        let input = PricingInput {
            part_tolerance: Some("0.002".to_string()),
            tolerance_multiplier: json!("1.0"),
            ..Default::default()
        };
        let config = input.into_configuration(&RateTable::default());
        assert_eq!(config.tolerance_multiplier.value(), dec!(1.0));
    }
}
