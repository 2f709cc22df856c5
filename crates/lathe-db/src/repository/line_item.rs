//! # Quote Line Item Repository
//!
//! Billable rows on a quote. Every write re-runs the totals aggregator in
//! the same transaction, so `quote.total` never trails its line items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    ├── quote editable?            (QuoteLocked → ROLLBACK)              │
//! │    ├── validate quantity / price  (Validation  → ROLLBACK)              │
//! │    ├── INSERT / UPDATE / soft DELETE quote_line_items                   │
//! │    └── recompute_in(quote_id)                                           │
//! │  COMMIT → LineItemChange { line_item, total }                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::aggregator::recompute_in;
use crate::codec::{money_text, parse_money};
use crate::error::{DbError, DbResult};
use crate::repository::part::ensure_in_quote;
use crate::repository::quote::editable_in;
use lathe_core::totals::line_item_prices;
use lathe_core::validation::{validate_name, validate_price, validate_quantity};
use lathe_core::{CoreError, Money, QuoteLineItem};

const LINE_ITEM_COLUMNS: &str = "id, quote_id, quote_part_id, description, quantity, \
     unit_price, total_price, position, deleted_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: i64,
    quote_id: i64,
    quote_part_id: Option<String>,
    description: String,
    quantity: i64,
    unit_price: String,
    total_price: String,
    position: i64,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LineItemRow {
    fn into_line_item(self) -> DbResult<QuoteLineItem> {
        Ok(QuoteLineItem {
            unit_price: parse_money("QuoteLineItem", "unit_price", &self.unit_price)?,
            total_price: parse_money("QuoteLineItem", "total_price", &self.total_price)?,
            id: self.id,
            quote_id: self.quote_id,
            quote_part_id: self.quote_part_id,
            description: self.description,
            quantity: self.quantity,
            position: self.position,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// A line item to add to a quote.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub quote_id: i64,
    pub quote_part_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Fields to change on a line item; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct LineItemUpdate {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Money>,
}

/// A written line item and the quote total after the write.
#[derive(Debug, Clone)]
pub struct LineItemChange {
    pub line_item: QuoteLineItem,
    pub total: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for quote line items.
#[derive(Debug, Clone)]
pub struct LineItemRepository {
    pool: SqlitePool,
}

impl LineItemRepository {
    /// Creates a new LineItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LineItemRepository { pool }
    }

    /// Adds a line item to the end of an editable quote.
    ///
    /// ## Errors
    /// - `Validation`: blank description, quantity ≤ 0, negative price
    /// - `Core(PartNotFound)`: the part isn't on this quote
    /// - `Core(QuoteLocked)`: the quote is past Draft
    pub async fn create(&self, item: &NewLineItem) -> DbResult<LineItemChange> {
        validate_name("description", &item.description)?;
        validate_quantity(item.quantity)?;
        validate_price(item.unit_price)?;

        let mut tx = self.pool.begin().await?;
        editable_in(&mut *tx, item.quote_id).await?;

        if let Some(part_id) = &item.quote_part_id {
            ensure_in_quote(&mut *tx, item.quote_id, part_id).await?;
        }

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM quote_line_items WHERE quote_id = ?1",
        )
        .bind(item.quote_id)
        .fetch_one(&mut *tx)
        .await?;

        let total_price = item.unit_price.multiply_quantity(item.quantity);
        let now = Utc::now();

        debug!(quote_id = item.quote_id, quantity = item.quantity, "Creating line item");

        let result = sqlx::query(
            r#"
            INSERT INTO quote_line_items (
                quote_id, quote_part_id, description, quantity,
                unit_price, total_price, position, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(item.quote_id)
        .bind(&item.quote_part_id)
        .bind(item.description.trim())
        .bind(item.quantity)
        .bind(money_text(item.unit_price))
        .bind(money_text(total_price))
        .bind(position)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let line_item = fetch_live_in(&mut *tx, item.quote_id, result.last_insert_rowid()).await?;
        let total = recompute_in(&mut *tx, item.quote_id).await?;

        tx.commit().await?;

        Ok(LineItemChange { line_item, total })
    }

    /// Changes description, quantity or unit price; `total_price` follows.
    pub async fn update(
        &self,
        quote_id: i64,
        id: i64,
        changes: &LineItemUpdate,
    ) -> DbResult<LineItemChange> {
        if let Some(description) = &changes.description {
            validate_name("description", description)?;
        }
        if let Some(quantity) = changes.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(unit_price) = changes.unit_price {
            validate_price(unit_price)?;
        }

        let mut tx = self.pool.begin().await?;
        editable_in(&mut *tx, quote_id).await?;

        let current = fetch_live_in(&mut *tx, quote_id, id).await?;
        let description = changes
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.description)
            .to_string();
        let quantity = changes.quantity.unwrap_or(current.quantity);
        let unit_price = changes.unit_price.unwrap_or(current.unit_price);

        debug!(quote_id, line_item_id = id, quantity, "Updating line item");

        write_prices_in(
            &mut *tx,
            id,
            &description,
            quantity,
            unit_price,
            unit_price.multiply_quantity(quantity),
        )
        .await?;

        let line_item = fetch_live_in(&mut *tx, quote_id, id).await?;
        let total = recompute_in(&mut *tx, quote_id).await?;

        tx.commit().await?;

        Ok(LineItemChange { line_item, total })
    }

    /// Soft-deletes a line item and returns the new quote total.
    ///
    /// Any calculation keyed to the item is left in place.
    pub async fn soft_delete(&self, quote_id: i64, id: i64) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;
        editable_in(&mut *tx, quote_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE quote_line_items SET deleted_at = ?3, updated_at = ?3
            WHERE id = ?1 AND quote_id = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(quote_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::LineItemNotFound(id).into());
        }

        debug!(quote_id, line_item_id = id, "Line item deleted");

        let total = recompute_in(&mut *tx, quote_id).await?;
        tx.commit().await?;

        Ok(total)
    }

    /// Gets a line item by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<QuoteLineItem>> {
        let row = sqlx::query_as::<_, LineItemRow>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM quote_line_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LineItemRow::into_line_item).transpose()
    }

    /// Line items of a quote by position.
    pub async fn list_for_quote(
        &self,
        quote_id: i64,
        include_deleted: bool,
    ) -> DbResult<Vec<QuoteLineItem>> {
        let rows = sqlx::query_as::<_, LineItemRow>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS} FROM quote_line_items
            WHERE quote_id = ?1 AND (?2 OR deleted_at IS NULL)
            ORDER BY position, id
            "#
        ))
        .bind(quote_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LineItemRow::into_line_item).collect()
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Reads a live line item of a quote, or `LineItemNotFound`.
async fn fetch_live_in(
    conn: &mut SqliteConnection,
    quote_id: i64,
    id: i64,
) -> DbResult<QuoteLineItem> {
    let row = sqlx::query_as::<_, LineItemRow>(&format!(
        r#"
        SELECT {LINE_ITEM_COLUMNS} FROM quote_line_items
        WHERE id = ?1 AND quote_id = ?2 AND deleted_at IS NULL
        "#
    ))
    .bind(id)
    .bind(quote_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or(DbError::Core(CoreError::LineItemNotFound(id)))?
        .into_line_item()
}

async fn write_prices_in(
    conn: &mut SqliteConnection,
    id: i64,
    description: &str,
    quantity: i64,
    unit_price: Money,
    total_price: Money,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE quote_line_items SET
            description = ?2,
            quantity = ?3,
            unit_price = ?4,
            total_price = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(description)
    .bind(quantity)
    .bind(money_text(unit_price))
    .bind(money_text(total_price))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes a calculation's final price into its line item.
///
/// The unit price is rounded to cents; the total is `unit × quantity`.
/// A line item already tied to a part only takes that part's price.
pub(crate) async fn apply_calculation_in(
    conn: &mut SqliteConnection,
    quote_id: i64,
    line_item_id: i64,
    quote_part_id: Option<&str>,
    final_price: Money,
) -> DbResult<QuoteLineItem> {
    let current = fetch_live_in(conn, quote_id, line_item_id).await?;
    if let (Some(owner), Some(part_id)) = (current.quote_part_id.as_deref(), quote_part_id) {
        if owner != part_id {
            return Err(CoreError::LineItemPartMismatch {
                line_item_id,
                part_id: part_id.to_string(),
            }
            .into());
        }
    }
    let (unit_price, total_price) = line_item_prices(final_price, current.quantity);

    debug!(
        quote_id,
        line_item_id,
        unit_price = %unit_price,
        "Applying calculation to line item"
    );

    write_prices_in(
        conn,
        line_item_id,
        &current.description,
        current.quantity,
        unit_price,
        total_price,
    )
    .await?;

    fetch_live_in(conn, quote_id, line_item_id).await
}

// =============================================================================
// Unit Tests
// =============================================================================
