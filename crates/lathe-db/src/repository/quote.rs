//! # Quote Repository
//!
//! Quotes and their lifecycle status.
//!
//! ## Quote Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Quote Lifecycle                                   │
//! │                                                                         │
//! │   RFQ ──convert──► Draft ──send──► Sent ──accept──► Accepted            │
//! │                      ▲              │                                   │
//! │                      │              ├──reject──► Rejected ─┐            │
//! │                      │              ├──drop────► Dropped  ─┤            │
//! │                      │              └──expire──► Expired  ─┤            │
//! │                      └──────────────revise─────────────────┘            │
//! │                                                                         │
//! │   Editable (line items, calculations): RFQ, Draft                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total` is never written here. See [`crate::aggregator`].

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::codec::parse_money;
use crate::error::{DbError, DbResult};
use lathe_core::validation::validate_name;
use lathe_core::{Quote, QuoteAction, QuoteStatus};

const QUOTE_COLUMNS: &str =
    "id, quote_number, customer_name, status, total, created_at, updated_at";

/// Raw `quotes` row; `total` is still text.
#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    id: i64,
    quote_number: String,
    customer_name: String,
    status: QuoteStatus,
    total: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QuoteRow {
    fn into_quote(self) -> DbResult<Quote> {
        Ok(Quote {
            total: parse_money("Quote", "total", &self.total)?,
            id: self.id,
            quote_number: self.quote_number,
            customer_name: self.customer_name,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for quote database operations.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Creates a quote with a zero total.
    ///
    /// ## Errors
    /// - `Validation` for a blank or overlong number/customer
    /// - `UniqueViolation` when the quote number is taken
    pub async fn create(
        &self,
        quote_number: &str,
        customer_name: &str,
        status: QuoteStatus,
    ) -> DbResult<Quote> {
        validate_name("quoteNumber", quote_number)?;
        validate_name("customerName", customer_name)?;

        let quote_number = quote_number.trim();
        let now = Utc::now();

        debug!(quote_number = %quote_number, status = %status, "Creating quote");

        let result = sqlx::query(
            r#"
            INSERT INTO quotes (quote_number, customer_name, status, total, created_at, updated_at)
            VALUES (?1, ?2, ?3, '0', ?4, ?4)
            "#,
        )
        .bind(quote_number)
        .bind(customer_name.trim())
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("quoteNumber", quote_number),
            other => other,
        })?;

        self.get(result.last_insert_rowid()).await
    }

    /// Gets a quote by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Quote>> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuoteRow::into_quote).transpose()
    }

    /// Gets a quote by ID, or `NotFound`.
    pub async fn get(&self, id: i64) -> DbResult<Quote> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", id))
    }

    /// Most recent quotes first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Quote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes ORDER BY id DESC LIMIT ?1"
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuoteRow::into_quote).collect()
    }

    /// Moves a quote through its lifecycle.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown quote
    /// - `Core(InvalidStatusTransition)` when the action doesn't apply
    pub async fn apply_action(&self, id: i64, action: QuoteAction) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;

        let quote = fetch_in(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", id))?;
        let next = quote.status.apply(action)?;
        let now = Utc::now();

        sqlx::query("UPDATE quotes SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(next)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(quote_id = id, from = %quote.status, to = %next, "Quote status changed");

        Ok(Quote {
            status: next,
            updated_at: now,
            ..quote
        })
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Reads a quote on an open connection (usually a transaction).
pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Quote>> {
    let row = sqlx::query_as::<_, QuoteRow>(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(QuoteRow::into_quote).transpose()
}

/// Reads a quote and fails with `QuoteLocked` unless it is editable.
pub(crate) async fn editable_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Quote> {
    let quote = fetch_in(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Quote", id))?;
    quote.ensure_editable()?;
    Ok(quote)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use lathe_core::{CoreError, Money, QuoteAction, QuoteStatus};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let quote = db
            .quotes()
            .create("Q-1001", "Acme Fixtures", QuoteStatus::Draft)
            .await
            .unwrap();

        assert_eq!(quote.total, Money::zero());
        assert_eq!(quote.status, QuoteStatus::Draft);

        let loaded = db.quotes().get(quote.id).await.unwrap();
        assert_eq!(loaded.quote_number, "Q-1001");
        assert_eq!(loaded.customer_name, "Acme Fixtures");
    }

    #[tokio::test]
    async fn test_duplicate_quote_number() {
        let db = db().await;
        db.quotes()
            .create("Q-1001", "Acme", QuoteStatus::Draft)
            .await
            .unwrap();

        let err = db
            .quotes()
            .create("Q-1001", "Other", QuoteStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_blank_customer_rejected() {
        let db = db().await;
        let err = db
            .quotes()
            .create("Q-1", "   ", QuoteStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_quote() {
        let db = db().await;
        assert!(db.quotes().get_by_id(999).await.unwrap().is_none());
        assert!(matches!(
            db.quotes().get(999).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_actions() {
        let db = db().await;
        let quote = db
            .quotes()
            .create("Q-2", "Acme", QuoteStatus::Rfq)
            .await
            .unwrap();

        let quote = db.quotes().apply_action(quote.id, QuoteAction::Convert).await.unwrap();
        assert_eq!(quote.status, QuoteStatus::Draft);

        let quote = db.quotes().apply_action(quote.id, QuoteAction::Send).await.unwrap();
        assert_eq!(quote.status, QuoteStatus::Sent);

        let quote = db.quotes().apply_action(quote.id, QuoteAction::Revise).await.unwrap();
        assert_eq!(quote.status, QuoteStatus::Draft);

        let stored = db.quotes().get(quote.id).await.unwrap();
        assert_eq!(stored.status, QuoteStatus::Draft);
    }

    #[tokio::test]
    async fn test_invalid_action_leaves_status() {
        let db = db().await;
        let quote = db
            .quotes()
            .create("Q-3", "Acme", QuoteStatus::Draft)
            .await
            .unwrap();

        let err = db
            .quotes()
            .apply_action(quote.id, QuoteAction::Accept)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidStatusTransition { .. })
        ));
        assert_eq!(db.quotes().get(quote.id).await.unwrap().status, QuoteStatus::Draft);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = db().await;
        for n in 1..=3 {
            db.quotes()
                .create(&format!("Q-{n}"), "Acme", QuoteStatus::Draft)
                .await
                .unwrap();
        }

        let quotes = db.quotes().list(2).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].quote_number, "Q-3");
    }
}
