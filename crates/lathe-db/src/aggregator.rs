//! # Quote Totals Aggregator
//!
//! The only writer of `quotes.total`.
//!
//! ## Where Recompute Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  line item create / update / delete ──┐                                 │
//! │                                       │  same transaction               │
//! │  save calculation → line item price ──┼──────────────► recompute_in()   │
//! │                                       │                     │           │
//! │  POST /api/quotes/{id}/recompute ─────┘                     ▼           │
//! │                                          SUM(total_price WHERE live)    │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │                                           UPDATE quotes SET total       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sum is taken in Rust over exact decimals. SQLite's `SUM` would
//! coerce the TEXT columns to floating point.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::codec::{money_text, parse_money};
use crate::error::{DbError, DbResult};
use lathe_core::{Money, QuoteStatus};

/// Keeps `quote.total` equal to the sum of its live line items.
#[derive(Debug, Clone)]
pub struct QuoteTotalsAggregator {
    pool: SqlitePool,
}

impl QuoteTotalsAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        QuoteTotalsAggregator { pool }
    }

    /// Recomputes and stores the quote total, returning it.
    ///
    /// Idempotent: with no line item change in between, two calls return
    /// the same total.
    pub async fn recompute(&self, quote_id: i64) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;
        let total = recompute_in(&mut *tx, quote_id).await?;
        tx.commit().await?;
        Ok(total)
    }

    /// Whether a quote in `status` may still have its pricing changed.
    pub fn is_editable(status: QuoteStatus) -> bool {
        status.is_editable()
    }
}

/// Recompute on an open transaction, after the line item writes it follows.
pub(crate) async fn recompute_in(conn: &mut SqliteConnection, quote_id: i64) -> DbResult<Money> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quotes WHERE id = ?1")
        .bind(quote_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(DbError::not_found("Quote", quote_id));
    }

    let prices: Vec<String> = sqlx::query_scalar(
        "SELECT total_price FROM quote_line_items WHERE quote_id = ?1 AND deleted_at IS NULL",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let total = prices
        .iter()
        .map(|text| parse_money("QuoteLineItem", "total_price", text))
        .sum::<DbResult<Money>>()?;

    sqlx::query("UPDATE quotes SET total = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(quote_id)
        .bind(money_text(total))
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    debug!(quote_id, total = %total, "Quote total recomputed");

    Ok(total)
}

// =============================================================================
// Unit Tests
// =============================================================================
