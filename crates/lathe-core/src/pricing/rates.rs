//! # Rate Tables
//!
//! Shop rates and multiplier bounds the engine is run against. A
//! `RateTable` is a plain value handed to every call, so two quotes can be
//! priced against different tables in the same process.
//!
//! ## Defaults
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────┐
//! │ Lead time multipliers    │ fast 2.0 · standard 1.0 · economy 0.85   │
//! │ Thread rates (per hole)  │ small 0.90 · medium 1.25 · large 1.75    │
//! │ Complexity               │ 1.15 – 3.15, default 2.15                │
//! │ Tolerance                │ 0.75 – 2.0, default 1.0                  │
//! └──────────────────────────┴──────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{LeadTimeOption, Multiplier};
use crate::validation::ValidationResult;

// =============================================================================
// Thread Sizes
// =============================================================================

/// Tapped hole size bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSize {
    Small,
    Medium,
    Large,
}

impl ThreadSize {
    pub const ALL: [ThreadSize; 3] = [ThreadSize::Small, ThreadSize::Medium, ThreadSize::Large];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ThreadSize::Small => "small",
            ThreadSize::Medium => "medium",
            ThreadSize::Large => "large",
        }
    }
}

/// Per-hole thread rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRates {
    pub small: Money,
    pub medium: Money,
    pub large: Money,
}

impl ThreadRates {
    pub fn get(&self, size: ThreadSize) -> Money {
        match size {
            ThreadSize::Small => self.small,
            ThreadSize::Medium => self.medium,
            ThreadSize::Large => self.large,
        }
    }
}

impl Default for ThreadRates {
    fn default() -> Self {
        ThreadRates {
            small: Money::new(Decimal::new(90, 2)),
            medium: Money::new(Decimal::new(125, 2)),
            large: Money::new(Decimal::new(175, 2)),
        }
    }
}

// =============================================================================
// Lead Time Multipliers
// =============================================================================

/// Default multiplier for each lead time option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LeadTimeMultipliers {
    pub fast: Multiplier,
    pub standard: Multiplier,
    pub economy: Multiplier,
}

impl LeadTimeMultipliers {
    pub fn for_option(&self, option: LeadTimeOption) -> Multiplier {
        match option {
            LeadTimeOption::Fast => self.fast,
            LeadTimeOption::Standard => self.standard,
            LeadTimeOption::Economy => self.economy,
        }
    }
}

impl Default for LeadTimeMultipliers {
    fn default() -> Self {
        LeadTimeMultipliers {
            fast: Multiplier::new(Decimal::new(2, 0)),
            standard: Multiplier::ONE,
            economy: Multiplier::new(Decimal::new(85, 2)),
        }
    }
}

// =============================================================================
// Multiplier Range
// =============================================================================

/// Inclusive bounds plus the value a fresh calculation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierRange {
    pub min: Multiplier,
    pub max: Multiplier,
    pub default: Multiplier,
}

impl MultiplierRange {
    pub fn contains(&self, value: Multiplier) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: Multiplier) -> Multiplier {
        value.bounded(self.min, self.max)
    }

    fn validate(&self, field: &str) -> ValidationResult<()> {
        if self.min.value() <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: format!("{field}.min"),
            });
        }
        if self.min > self.max || !self.contains(self.default) {
            return Err(ValidationError::OutOfRange {
                field: format!("{field}.default"),
                min: self.min.value(),
                max: self.max.value(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Rate Table
// =============================================================================

/// Everything the engine needs besides the user's own inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    pub lead_time: LeadTimeMultipliers,
    pub thread_rates: ThreadRates,
    pub complexity: MultiplierRange,
    pub tolerance: MultiplierRange,
}

impl Default for RateTable {
    fn default() -> Self {
        RateTable {
            lead_time: LeadTimeMultipliers::default(),
            thread_rates: ThreadRates::default(),
            complexity: MultiplierRange {
                min: Multiplier::new(Decimal::new(115, 2)),
                max: Multiplier::new(Decimal::new(315, 2)),
                default: Multiplier::new(Decimal::new(215, 2)),
            },
            tolerance: MultiplierRange {
                min: Multiplier::new(Decimal::new(75, 2)),
                max: Multiplier::new(Decimal::new(2, 0)),
                default: Multiplier::ONE,
            },
        }
    }
}

impl RateTable {
    /// Checks that the table itself is usable.
    ///
    /// ## Rules
    /// - Lead time multipliers must be positive
    /// - Thread rates must not be negative
    /// - Each range must have `0 < min <= default <= max`
    pub fn validate(&self) -> ValidationResult<()> {
        for option in [
            LeadTimeOption::Fast,
            LeadTimeOption::Standard,
            LeadTimeOption::Economy,
        ] {
            if self.lead_time.for_option(option).value() <= Decimal::ZERO {
                return Err(ValidationError::MustBePositive {
                    field: format!("leadTime.{}", option.as_str()),
                });
            }
        }

        for size in ThreadSize::ALL {
            if self.thread_rates.get(size).is_negative() {
                return Err(ValidationError::Negative {
                    field: format!("threadRates.{}", size.as_str()),
                });
            }
        }

        self.complexity.validate("complexity")?;
        self.tolerance.validate("tolerance")?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
