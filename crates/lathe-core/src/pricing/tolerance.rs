//! # Tolerance Defaults
//!
//! Suggests a tolerance multiplier from the tightest tolerance on a part's
//! drawing. The suggestion is only used the first time a part is priced;
//! once a calculation is stored its multiplier wins.
//!
//! ## Bands (inches)
//! ```text
//! ┌───────────────────────────┬────────────┐
//! │ tolerance ≥ 0.010         │   × 0.75   │  loose, cheaper
//! │ 0.005 ≤ tolerance < 0.010 │   × 1.0    │  standard
//! │ 0.003 ≤ tolerance < 0.005 │   × 1.2    │  tight
//! │ tolerance < 0.003         │   × 1.5    │  precision
//! └───────────────────────────┴────────────┘
//! ```

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::types::Multiplier;

const LOOSE_THRESHOLD: Decimal = Decimal::from_parts(10, 0, 0, false, 3);
const STANDARD_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 3);
const TIGHT_THRESHOLD: Decimal = Decimal::from_parts(3, 0, 0, false, 3);

const LOOSE_MULTIPLIER: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
const TIGHT_MULTIPLIER: Decimal = Decimal::from_parts(12, 0, 0, false, 1);
const PRECISION_MULTIPLIER: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Multiplier for a numeric tolerance.
///
/// ## Example
/// ```rust
/// use lathe_core::pricing::default_tolerance_multiplier;
/// use rust_decimal::Decimal;
///
/// let tight = default_tolerance_multiplier(Decimal::new(2, 3)); // 0.002"
/// assert_eq!(tight.value(), Decimal::new(15, 1));
/// ```
pub fn default_tolerance_multiplier(tolerance: Decimal) -> Multiplier {
    let tolerance = tolerance.abs();
    let value = if tolerance >= LOOSE_THRESHOLD {
        LOOSE_MULTIPLIER
    } else if tolerance >= STANDARD_THRESHOLD {
        Decimal::ONE
    } else if tolerance >= TIGHT_THRESHOLD {
        TIGHT_MULTIPLIER
    } else {
        PRECISION_MULTIPLIER
    };
    Multiplier::new(value)
}

/// Pulls the first number out of free text such as `"±0.005"`,
/// `".005 in"` or `"+/- 0.002"`. The sign is dropped.
pub fn parse_tolerance(text: &str) -> Option<Decimal> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let start = chars.iter().enumerate().find_map(|(i, &(offset, c))| {
        let digit_follows = chars.get(i + 1).is_some_and(|&(_, n)| n.is_ascii_digit());
        (c.is_ascii_digit() || (c == '.' && digit_follows)).then_some(offset)
    })?;

    let mut number = String::new();
    let mut seen_dot = false;
    for c in text[start..].chars() {
        match c {
            '0'..='9' => number.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                number.push(c);
            }
            _ => break,
        }
    }

    if number.starts_with('.') {
        number.insert(0, '0');
    }
    if number.ends_with('.') {
        number.pop();
    }

    Decimal::from_str(&number).ok()
}

/// Suggested multiplier for a part's tolerance text.
///
/// Missing or unreadable tolerances suggest nothing, which the caller
/// treats as the neutral ×1.0.
pub fn suggest_tolerance_multiplier(tolerance: Option<&str>) -> Option<Multiplier> {
    tolerance
        .and_then(parse_tolerance)
        .map(default_tolerance_multiplier)
}

// =============================================================================
// Unit Tests
// =============================================================================
