//! # Calculation Repository
//!
//! Stores the current pricing calculation for each slot of a quote.
//!
//! ## Slot Matching
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(quote 7, part P, line 12)                                         │
//! │       │                                                                 │
//! │       ├── row (7, Q, 12), Q != P?        → LineItemPartMismatch         │
//! │       ├── row (7, P, *) exists?          → replace it, version + 1      │
//! │       │     (a stray (7, NULL, 12) row is folded into it)               │
//! │       ├── row (7, NULL, 12) exists?      → adopt it: set part P,        │
//! │       │                                    replace, version + 1         │
//! │       └── neither                        → insert, version 1            │
//! │                                                                         │
//! │  save(quote 7, no part, line 12)                                        │
//! │       ├── row (7, *, 12) exists?         → replace it, keep its part,   │
//! │       │                                    version + 1                  │
//! │       └── otherwise                      → insert, version 1            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Calculator Save
//! [`CalculationRepository::save_and_apply`] runs the whole sequence in one
//! transaction: editable check, upsert, line item price, quote total. Any
//! failure rolls all of it back.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::aggregator::recompute_in;
use crate::codec::{
    money_text, multiplier_text, parse_money, parse_multiplier, parse_optional_money,
};
use crate::error::{DbError, DbResult};
use crate::repository::line_item::apply_calculation_in;
use crate::repository::part::ensure_in_quote;
use crate::repository::quote::{editable_in, fetch_in};
use lathe_core::{
    CalculationKey, CalculationRecord, CoreError, LeadTimeOption, Money, NewCalculation,
    QuoteLineItem,
};

const CALCULATION_COLUMNS: &str = r#"
    c.id, c.quote_id, c.quote_part_id, c.quote_line_item_id,
    c.toolpath_grand_total, c.lead_time_option, c.lead_time_multiplier,
    c.small_thread_count, c.small_thread_rate,
    c.medium_thread_count, c.medium_thread_rate,
    c.large_thread_count, c.large_thread_rate,
    c.total_thread_cost, c.complexity_multiplier, c.tolerance_multiplier,
    c.tooling_cost, c.tooling_markup,
    c.base_price, c.adjusted_price, c.final_price,
    c.notes, c.version, c.created_at, c.updated_at
"#;

const ENTITY: &str = "QuoteCalculation";

/// Raw `quote_calculations` row; decimals are still text.
#[derive(Debug, sqlx::FromRow)]
struct CalculationRow {
    id: i64,
    quote_id: i64,
    quote_part_id: Option<String>,
    quote_line_item_id: Option<i64>,
    toolpath_grand_total: String,
    lead_time_option: LeadTimeOption,
    lead_time_multiplier: String,
    small_thread_count: i64,
    small_thread_rate: String,
    medium_thread_count: i64,
    medium_thread_rate: String,
    large_thread_count: i64,
    large_thread_rate: String,
    total_thread_cost: String,
    complexity_multiplier: String,
    tolerance_multiplier: String,
    tooling_cost: Option<String>,
    tooling_markup: Option<String>,
    base_price: String,
    adjusted_price: String,
    final_price: String,
    notes: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CalculationRow {
    fn into_record(self) -> DbResult<CalculationRecord> {
        let money = |field: &str, text: &str| parse_money(ENTITY, field, text);
        let multiplier = |field: &str, text: &str| parse_multiplier(ENTITY, field, text);

        Ok(CalculationRecord {
            toolpath_grand_total: money("toolpath_grand_total", &self.toolpath_grand_total)?,
            lead_time_multiplier: multiplier("lead_time_multiplier", &self.lead_time_multiplier)?,
            small_thread_rate: money("small_thread_rate", &self.small_thread_rate)?,
            medium_thread_rate: money("medium_thread_rate", &self.medium_thread_rate)?,
            large_thread_rate: money("large_thread_rate", &self.large_thread_rate)?,
            total_thread_cost: money("total_thread_cost", &self.total_thread_cost)?,
            complexity_multiplier: multiplier("complexity_multiplier", &self.complexity_multiplier)?,
            tolerance_multiplier: multiplier("tolerance_multiplier", &self.tolerance_multiplier)?,
            tooling_cost: parse_optional_money(ENTITY, "tooling_cost", self.tooling_cost.as_deref())?,
            tooling_markup: parse_optional_money(
                ENTITY,
                "tooling_markup",
                self.tooling_markup.as_deref(),
            )?,
            base_price: money("base_price", &self.base_price)?,
            adjusted_price: money("adjusted_price", &self.adjusted_price)?,
            final_price: money("final_price", &self.final_price)?,
            id: self.id,
            quote_id: self.quote_id,
            quote_part_id: self.quote_part_id,
            quote_line_item_id: self.quote_line_item_id,
            lead_time_option: self.lead_time_option,
            small_thread_count: self.small_thread_count,
            medium_thread_count: self.medium_thread_count,
            large_thread_count: self.large_thread_count,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Result of the calculator's save.
#[derive(Debug, Clone)]
pub struct SavedCalculation {
    pub calculation: CalculationRecord,
    /// The line item that took the final price, when the slot has one.
    pub line_item: Option<QuoteLineItem>,
    pub total: Money,
}

/// Repository for quote calculations.
#[derive(Debug, Clone)]
pub struct CalculationRepository {
    pool: SqlitePool,
}

impl CalculationRepository {
    /// Creates a new CalculationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CalculationRepository { pool }
    }

    /// Upserts a calculation into its slot, last write wins.
    ///
    /// This is the bare persistence step: no status gate, no line item
    /// update, no recompute. The calculator uses [`Self::save_and_apply`].
    pub async fn save(&self, new: &NewCalculation) -> DbResult<CalculationRecord> {
        let mut tx = self.pool.begin().await?;

        if fetch_in(&mut *tx, new.quote_id).await?.is_none() {
            return Err(DbError::not_found("Quote", new.quote_id));
        }

        let record = upsert_in(&mut *tx, new, None).await?;
        tx.commit().await?;

        Ok(record)
    }

    /// Saves a calculation, prices its line item and recomputes the total.
    ///
    /// ## Errors
    /// - `NotFound`: unknown quote
    /// - `Core(QuoteLocked)`: quote is Sent or later
    /// - `Core(StaleCalculation)`: `expected_version` doesn't match the slot
    /// - `Core(LineItemNotFound)`: line item missing or deleted
    ///
    /// Nothing is written when any of these fail.
    pub async fn save_and_apply(
        &self,
        new: &NewCalculation,
        expected_version: Option<i64>,
    ) -> DbResult<SavedCalculation> {
        let mut tx = self.pool.begin().await?;

        editable_in(&mut *tx, new.quote_id).await?;

        let calculation = upsert_in(&mut *tx, new, expected_version).await?;

        let line_item = match new.quote_line_item_id {
            Some(line_item_id) => Some(
                apply_calculation_in(
                    &mut *tx,
                    new.quote_id,
                    line_item_id,
                    new.quote_part_id.as_deref(),
                    calculation.final_price,
                )
                .await?,
            ),
            None => None,
        };

        let total = recompute_in(&mut *tx, new.quote_id).await?;

        tx.commit().await?;

        info!(
            quote_id = new.quote_id,
            calculation_id = calculation.id,
            version = calculation.version,
            final_price = %calculation.final_price,
            total = %total,
            "Calculation saved"
        );

        Ok(SavedCalculation {
            calculation,
            line_item,
            total,
        })
    }

    /// The current record for one slot.
    pub async fn find_for_key(
        &self,
        quote_id: i64,
        key: &CalculationKey,
    ) -> DbResult<Option<CalculationRecord>> {
        let mut conn = self.pool.acquire().await?;
        find_in(&mut *conn, quote_id, key).await
    }

    /// One current record per slot, in part order then line item order.
    pub async fn latest_for_quote(&self, quote_id: i64) -> DbResult<Vec<CalculationRecord>> {
        let rows = sqlx::query_as::<_, CalculationRow>(&format!(
            r#"
            SELECT {CALCULATION_COLUMNS}
            FROM quote_calculations c
            LEFT JOIN quote_parts p ON p.id = c.quote_part_id
            WHERE c.quote_id = ?1
            ORDER BY (c.quote_part_id IS NULL), p.position, c.quote_part_id, c.quote_line_item_id
            "#
        ))
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CalculationRow::into_record).collect()
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn fetch_where(
    conn: &mut SqliteConnection,
    filter: &str,
    quote_id: i64,
    slot: SlotValue<'_>,
) -> DbResult<Option<CalculationRecord>> {
    let sql = format!(
        "SELECT {CALCULATION_COLUMNS} FROM quote_calculations c WHERE c.quote_id = ?1 AND {filter}"
    );
    let query = sqlx::query_as::<_, CalculationRow>(&sql).bind(quote_id);
    let query = match slot {
        SlotValue::Id(id) => query.bind(id),
        SlotValue::Part(part_id) => query.bind(part_id),
    };

    let row = query.fetch_optional(&mut *conn).await?;
    row.map(CalculationRow::into_record).transpose()
}

#[derive(Clone, Copy)]
enum SlotValue<'a> {
    Id(i64),
    Part(&'a str),
}

async fn find_in(
    conn: &mut SqliteConnection,
    quote_id: i64,
    key: &CalculationKey,
) -> DbResult<Option<CalculationRecord>> {
    match key {
        CalculationKey::Part(part_id) => {
            fetch_where(conn, "c.quote_part_id = ?2", quote_id, SlotValue::Part(part_id)).await
        }
        CalculationKey::LineItem(line_item_id) => {
            fetch_where(
                conn,
                "c.quote_line_item_id = ?2",
                quote_id,
                SlotValue::Id(*line_item_id),
            )
            .await
        }
    }
}

/// Finds the one record a save must replace.
///
/// A line item carries at most one record. A part save folds a
/// line-item-only record for its line item into the part's record.
async fn find_slot_in(
    conn: &mut SqliteConnection,
    new: &NewCalculation,
    key: &CalculationKey,
) -> DbResult<Option<CalculationRecord>> {
    let part_id = match key {
        CalculationKey::Part(part_id) => part_id,
        CalculationKey::LineItem(_) => return find_in(conn, new.quote_id, key).await,
    };

    let by_line = match new.quote_line_item_id {
        Some(line_item_id) => {
            find_in(conn, new.quote_id, &CalculationKey::LineItem(line_item_id)).await?
        }
        None => None,
    };
    if let Some(record) = &by_line {
        if record.quote_part_id.as_deref().is_some_and(|owner| owner != part_id) {
            return Err(CoreError::LineItemPartMismatch {
                line_item_id: record.quote_line_item_id.unwrap_or_default(),
                part_id: part_id.clone(),
            }
            .into());
        }
    }

    match (find_in(conn, new.quote_id, key).await?, by_line) {
        (Some(part_record), Some(line_record)) if part_record.id != line_record.id => {
            debug!(
                calculation_id = line_record.id,
                into = part_record.id,
                "Folding line item calculation into part"
            );
            sqlx::query("DELETE FROM quote_calculations WHERE id = ?1")
                .bind(line_record.id)
                .execute(&mut *conn)
                .await?;
            Ok(Some(part_record))
        }
        (Some(part_record), _) => Ok(Some(part_record)),
        (None, line_record) => Ok(line_record),
    }
}

/// Replaces the slot's record or inserts the first one.
async fn upsert_in(
    conn: &mut SqliteConnection,
    new: &NewCalculation,
    expected_version: Option<i64>,
) -> DbResult<CalculationRecord> {
    let key = new.key()?;
    if let Some(part_id) = &new.quote_part_id {
        ensure_in_quote(&mut *conn, new.quote_id, part_id).await?;
    }

    let existing = find_slot_in(conn, new, &key).await?;

    let current_version = existing.as_ref().map(|record| record.version).unwrap_or(0);
    if let Some(expected) = expected_version {
        if expected != current_version {
            return Err(CoreError::StaleCalculation {
                expected,
                actual: current_version,
            }
            .into());
        }
    }

    let config = &new.configuration;
    let breakdown = &new.breakdown;
    let tooling_cost = config.tooling_enabled.then(|| money_text(config.tooling_cost));
    let tooling_markup = config
        .tooling_enabled
        .then(|| money_text(breakdown.tooling_markup));
    let now = Utc::now();

    let id = match existing {
        Some(record) => {
            debug!(calculation_id = record.id, version = record.version + 1, "Replacing calculation");

            sqlx::query(
                r#"
                UPDATE quote_calculations SET
                    quote_part_id = COALESCE(?2, quote_part_id), quote_line_item_id = ?3,
                    toolpath_grand_total = ?4, lead_time_option = ?5, lead_time_multiplier = ?6,
                    small_thread_count = ?7, small_thread_rate = ?8,
                    medium_thread_count = ?9, medium_thread_rate = ?10,
                    large_thread_count = ?11, large_thread_rate = ?12,
                    total_thread_cost = ?13, complexity_multiplier = ?14, tolerance_multiplier = ?15,
                    tooling_cost = ?16, tooling_markup = ?17,
                    base_price = ?18, adjusted_price = ?19, final_price = ?20,
                    notes = ?21, version = version + 1, updated_at = ?22
                WHERE id = ?1
                "#,
            )
            .bind(record.id)
            .bind(&new.quote_part_id)
            .bind(new.quote_line_item_id)
            .bind(money_text(config.toolpath_grand_total))
            .bind(config.lead_time_option)
            .bind(multiplier_text(config.lead_time_multiplier))
            .bind(config.thread_counts.small)
            .bind(money_text(config.thread_rates.small))
            .bind(config.thread_counts.medium)
            .bind(money_text(config.thread_rates.medium))
            .bind(config.thread_counts.large)
            .bind(money_text(config.thread_rates.large))
            .bind(money_text(breakdown.thread_cost))
            .bind(multiplier_text(config.complexity_multiplier))
            .bind(multiplier_text(config.tolerance_multiplier))
            .bind(&tooling_cost)
            .bind(&tooling_markup)
            .bind(money_text(breakdown.base_price))
            .bind(money_text(breakdown.adjusted_price))
            .bind(money_text(breakdown.final_price))
            .bind(&config.notes)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            record.id
        }
        None => {
            debug!(quote_id = new.quote_id, "Inserting calculation");

            sqlx::query(
                r#"
                INSERT INTO quote_calculations (
                    quote_id, quote_part_id, quote_line_item_id,
                    toolpath_grand_total, lead_time_option, lead_time_multiplier,
                    small_thread_count, small_thread_rate,
                    medium_thread_count, medium_thread_rate,
                    large_thread_count, large_thread_rate,
                    total_thread_cost, complexity_multiplier, tolerance_multiplier,
                    tooling_cost, tooling_markup,
                    base_price, adjusted_price, final_price,
                    notes, version, created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3,
                    ?4, ?5, ?6,
                    ?7, ?8,
                    ?9, ?10,
                    ?11, ?12,
                    ?13, ?14, ?15,
                    ?16, ?17,
                    ?18, ?19, ?20,
                    ?21, 1, ?22, ?22
                )
                "#,
            )
            .bind(new.quote_id)
            .bind(&new.quote_part_id)
            .bind(new.quote_line_item_id)
            .bind(money_text(config.toolpath_grand_total))
            .bind(config.lead_time_option)
            .bind(multiplier_text(config.lead_time_multiplier))
            .bind(config.thread_counts.small)
            .bind(money_text(config.thread_rates.small))
            .bind(config.thread_counts.medium)
            .bind(money_text(config.thread_rates.medium))
            .bind(config.thread_counts.large)
            .bind(money_text(config.thread_rates.large))
            .bind(money_text(breakdown.thread_cost))
            .bind(multiplier_text(config.complexity_multiplier))
            .bind(multiplier_text(config.tolerance_multiplier))
            .bind(&tooling_cost)
            .bind(&tooling_markup)
            .bind(money_text(breakdown.base_price))
            .bind(money_text(breakdown.adjusted_price))
            .bind(money_text(breakdown.final_price))
            .bind(&config.notes)
            .bind(now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid()
        }
    };

    fetch_where(conn, "c.id = ?2", new.quote_id, SlotValue::Id(id))
        .await?
        .ok_or_else(|| DbError::not_found("QuoteCalculation", id))
}

// =============================================================================
// Unit Tests
// =============================================================================
