//! # Quote Part Repository
//!
//! Manufactured parts on a quote. A part's position drives the order the
//! calculator walks them in.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::quote::editable_in;
use lathe_core::validation::validate_name;
use lathe_core::{CoreError, QuotePart};

const PART_COLUMNS: &str = "id, quote_id, name, tolerance, position, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PartRow {
    id: String,
    quote_id: i64,
    name: String,
    tolerance: Option<String>,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PartRow> for QuotePart {
    fn from(row: PartRow) -> Self {
        QuotePart {
            id: row.id,
            quote_id: row.quote_id,
            name: row.name,
            tolerance: row.tolerance,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for quote parts.
#[derive(Debug, Clone)]
pub struct PartRepository {
    pool: SqlitePool,
}

impl PartRepository {
    /// Creates a new PartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PartRepository { pool }
    }

    /// Appends a part to an editable quote.
    ///
    /// A blank tolerance is stored as NULL.
    pub async fn create(
        &self,
        quote_id: i64,
        name: &str,
        tolerance: Option<&str>,
    ) -> DbResult<QuotePart> {
        validate_name("name", name)?;

        let tolerance = tolerance
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let mut tx = self.pool.begin().await?;
        editable_in(&mut *tx, quote_id).await?;

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM quote_parts WHERE quote_id = ?1",
        )
        .bind(quote_id)
        .fetch_one(&mut *tx)
        .await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(quote_id, part_id = %id, position, "Creating quote part");

        sqlx::query(
            r#"
            INSERT INTO quote_parts (id, quote_id, name, tolerance, position, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(quote_id)
        .bind(name.trim())
        .bind(&tolerance)
        .bind(position)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(QuotePart {
            id,
            quote_id,
            name: name.trim().to_string(),
            tolerance,
            position,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a part by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<QuotePart>> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM quote_parts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QuotePart::from))
    }

    /// Parts of a quote in calculator order.
    pub async fn list_for_quote(&self, quote_id: i64) -> DbResult<Vec<QuotePart>> {
        let rows = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM quote_parts WHERE quote_id = ?1 ORDER BY position, id"
        ))
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QuotePart::from).collect())
    }
}

/// Fails with `PartNotFound` unless the part belongs to the quote.
pub(crate) async fn ensure_in_quote(
    conn: &mut SqliteConnection,
    quote_id: i64,
    part_id: &str,
) -> DbResult<()> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM quote_parts WHERE id = ?1 AND quote_id = ?2")
            .bind(part_id)
            .bind(quote_id)
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::Core(CoreError::PartNotFound(part_id.to_string()))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
