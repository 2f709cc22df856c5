//! # Quote Totals
//!
//! The pure half of the totals aggregator: what a quote's total *should* be
//! given its line items. Writing it back is lathe-db's job.

use crate::money::Money;
use crate::types::QuoteLineItem;

/// Sum of `total_price` over line items that are not soft-deleted.
///
/// ## Example
/// ```text
/// [ {totalPrice: 100}, {totalPrice: 218.87}, {totalPrice: 50, deleted} ]
///      │
///      ▼
/// quote_total(...) = 318.87
/// ```
pub fn quote_total<'a, I>(line_items: I) -> Money
where
    I: IntoIterator<Item = &'a QuoteLineItem>,
{
    line_items
        .into_iter()
        .filter(|item| !item.is_deleted())
        .map(|item| item.total_price)
        .sum()
}

/// Price a line item takes on when a calculation is applied to it.
///
/// Returns `(unit_price, total_price)`; the unit price is rounded to cents.
pub fn line_item_prices(final_price: Money, quantity: i64) -> (Money, Money) {
    let unit_price = final_price.round_to_cents();
    (unit_price, unit_price.multiply_quantity(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(id: i64, total: Money, deleted: bool) -> QuoteLineItem {
        QuoteLineItem {
            id,
            quote_id: 1,
            quote_part_id: None,
            description: format!("Line {id}"),
            quantity: 1,
            unit_price: total,
            total_price: total,
            position: id,
            deleted_at: deleted.then(Utc::now),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sums_live_items() {
        let items = vec![
            item(1, Money::new(dec!(100)), false),
            item(2, Money::new(dec!(218.87)), false),
            item(3, Money::new(dec!(50)), true),
        ];
        assert_eq!(quote_total(&items), Money::new(dec!(318.87)));
        assert_eq!(quote_total(&items), quote_total(&items));
    }

    #[test]
    fn test_empty_quote_is_zero() {
        let items: Vec<QuoteLineItem> = Vec::new();
        assert_eq!(quote_total(&items), Money::zero());
    }

    #[test]
    fn test_line_item_prices_round_unit_price() {
        let (unit, total) = line_item_prices(Money::new(dec!(218.8705)), 3);
        assert_eq!(unit, Money::new(dec!(218.87)));
        assert_eq!(total, Money::new(dec!(656.61)));
    }
}
