//! # Decimal Column Codec
//!
//! Money and multipliers live in TEXT columns. These helpers turn the text
//! back into exact decimals and report the column when they can't.
//!
//! ```text
//! "218.8700" ──► parse_money ──► Money(218.8700)
//! "abc"      ──► parse_money ──► DbError::InvalidData { entity, field, "abc" }
//! ```

use std::str::FromStr;

use lathe_core::{Money, Multiplier};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

/// Parses a stored decimal.
pub fn parse_decimal(entity: &str, field: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| DbError::invalid_data(entity, field, value))
}

pub fn parse_money(entity: &str, field: &str, value: &str) -> DbResult<Money> {
    parse_decimal(entity, field, value).map(Money::new)
}

/// Parses a nullable money column.
pub fn parse_optional_money(entity: &str, field: &str, value: Option<&str>) -> DbResult<Option<Money>> {
    value
        .map(|text| parse_money(entity, field, text))
        .transpose()
}

pub fn parse_multiplier(entity: &str, field: &str, value: &str) -> DbResult<Multiplier> {
    parse_decimal(entity, field, value).map(Multiplier::new)
}

/// Text form written to a money column.
#[inline]
pub fn money_text(amount: Money) -> String {
    amount.amount().to_string()
}

#[inline]
pub fn multiplier_text(value: Multiplier) -> String {
    value.value().to_string()
}
