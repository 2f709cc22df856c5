//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    101.80 × 2.15 = 218.86999999999998  ❌ WRONG!                        │
//! │                                                                         │
//! │  A quote is re-priced every time a part is revisited, so any drift     │
//! │  shows up as a price that changes when nobody touched it.              │
//! │                                                                         │
//! │  OUR SOLUTION: Base-10 Decimals                                         │
//! │    101.80 × 2.15 = 218.8700 exactly                                     │
//! │    Rounding to cents happens once, when a price lands on a line item   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lathe_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let toolpath = Money::new(Decimal::new(10180, 2)); // $101.80
//! let doubled = toolpath.multiply_quantity(2);       // $203.60
//! assert_eq!(doubled.to_string(), "$203.60");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// An exact monetary amount in dollars.
///
/// ## Design Decisions
/// - **Decimal, not cents**: engine outputs such as `218.8700` are kept exact
///   and only rounded when they become a line item price
/// - **Saturating arithmetic**: the engine must never panic, so overflow
///   clamps to `Decimal::MAX`/`Decimal::MIN`
/// - **Serialized as a string**: `"218.87"` survives JSON untouched
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  toolpathGrandTotal ──┬──► basePrice ──► adjustedPrice ──► finalPrice  │
/// │  threadCost ──────────┘                                   │            │
/// │  toolingMarkup ───────────────────────────────────────────┘            │
/// │                                                                         │
/// │  finalPrice ──► round_to_cents ──► LineItem.unitPrice                   │
/// │  LineItem.totalPrice (Σ) ──► Quote.total                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps a decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Returns zero money value.
    ///
    /// ## Example
    /// ```rust
    /// use lathe_core::money::Money;
    ///
    /// let zero = Money::zero();
    /// assert!(zero.is_zero());
    /// ```
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Creates a Money value from whole cents.
    ///
    /// ## Example
    /// ```rust
    /// use lathe_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "$10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Rounds to whole cents, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use lathe_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let exact = Money::new(Decimal::new(2188705, 4)); // 218.8705
    /// assert_eq!(exact.round_to_cents(), Money::from_cents(21887));
    /// ```
    pub fn round_to_cents(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiplies by a decimal factor, saturating on overflow.
    pub fn scale(&self, factor: Decimal) -> Money {
        match self.0.checked_mul(factor) {
            Some(value) => Money(value),
            None => Money(saturate(self.0.is_sign_negative() != factor.is_sign_negative())),
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use lathe_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(21887);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_cents(65661));
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Calculation finalPrice: $218.87
    /// Line item quantity: 3
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line item totalPrice: $656.61
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Money {
        self.scale(Decimal::from(qty))
    }
}

fn saturate(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money rounded to cents, e.g. `$218.87` or `-$5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cents = self.round_to_cents().0;
        let sign = if cents.is_sign_negative() && !cents.is_zero() {
            "-"
        } else {
            ""
        };
        cents.set_sign_positive(true);
        cents.rescale(2);
        write!(f, "{}${}", sign, cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

/// Saturating addition.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        match self.0.checked_add(other.0) {
            Some(value) => Money(value),
            None => Money(saturate(self.0.is_sign_negative())),
        }
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Saturating subtraction.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        match self.0.checked_sub(other.0) {
            Some(value) => Money(value),
            None => Money(saturate(self.0.is_sign_negative())),
        }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.amount(), dec!(10.99));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::new(dec!(5)).to_string(), "$5.00");
        assert_eq!(Money::new(dec!(-5.5)).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
        assert_eq!(Money::new(dec!(218.8700)).to_string(), "$218.87");
    }

    #[test]
    fn test_exact_multiplication() {
        let base = Money::new(dec!(101.80));
        assert_eq!(base.scale(dec!(2.15)), Money::new(dec!(218.87)));
    }

    #[test]
    fn test_round_to_cents_half_away_from_zero() {
        assert_eq!(Money::new(dec!(0.125)).round_to_cents(), Money::new(dec!(0.13)));
        assert_eq!(Money::new(dec!(0.135)).round_to_cents(), Money::new(dec!(0.14)));
        assert_eq!(Money::new(dec!(-0.125)).round_to_cents(), Money::new(dec!(-0.13)));
        assert_eq!(Money::new(dec!(10.994)).round_to_cents(), Money::new(dec!(10.99)));
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!(a + b, Money::from_cents(1500));
        assert_eq!(a - b, Money::from_cents(500));
        assert_eq!(a.multiply_quantity(3), Money::from_cents(3000));
    }

    #[test]
    fn test_sum() {
        let items = [Money::new(dec!(100)), Money::new(dec!(218.87))];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::new(dec!(318.87)));

        let empty: Vec<Money> = Vec::new();
        assert_eq!(empty.into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_overflow_saturates() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.scale(dec!(2)), Money::new(Decimal::MAX));
        assert_eq!(huge + huge, Money::new(Decimal::MAX));
        assert_eq!(huge.scale(dec!(-2)), Money::new(Decimal::MIN));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::new(dec!(-1));
        assert!(negative.is_negative());
        assert!(!negative.is_positive());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(dec!(218.87))).unwrap();
        assert_eq!(json, "\"218.87\"");

        let parsed: Money = serde_json::from_str("\"101.80\"").unwrap();
        assert_eq!(parsed, Money::new(dec!(101.8)));
    }
}
