//! # Database Handle
//!
//! Opens the SQLite pool, applies migrations and hands out repositories.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ServerConfig.database ──► DbConfig::new(path).max_connections(n)       │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  Database::new(config)                                                  │
//! │       ├── file: WAL journal, NORMAL sync, foreign keys, busy timeout    │
//! │       ├── ":memory:": one connection that never expires (tests)         │
//! │       └── migrations::run_migrations                                    │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  db.quotes() / db.parts() / db.line_items() / db.calculations()         │
//! │  db.totals()          each one a thin wrapper around the shared pool    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A calculation save holds one pooled connection for its whole
//! transaction. SQLite still serializes writers, so `busy_timeout` decides
//! how long a second save waits before failing.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::aggregator::QuoteTotalsAggregator;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CalculationRepository, LineItemRepository, PartRepository, QuoteRepository,
};

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/lathe/lathe.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`. The file is created on first open.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits on SQLite's lock before `database is locked`.
    pub busy_timeout: Duration,

    /// Apply embedded migrations on open.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory database, for tests.
    ///
    /// Limited to one connection: every connection to `:memory:` would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig::new(IN_MEMORY).max_connections(1)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared database handle. Cloning it clones the pool handle only.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn list_calculations(
///     State(state): State<AppState>,
///     Path(quote_id): Path<i64>,
/// ) -> ApiResult<Json<Vec<CalculationRecord>>> {
///     let records = state.db.calculations().latest_for_quote(quote_id).await?;
///     Ok(Json(records))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening quote database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);

        if config.is_in_memory() {
            // Dropping the only connection would drop the database with it
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for the health check and migration status.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn quotes(&self) -> QuoteRepository {
        QuoteRepository::new(self.pool.clone())
    }

    pub fn parts(&self) -> PartRepository {
        PartRepository::new(self.pool.clone())
    }

    pub fn line_items(&self) -> LineItemRepository {
        LineItemRepository::new(self.pool.clone())
    }

    /// The calculator's save path lives here.
    ///
    /// ```rust,ignore
    /// let saved = db.calculations().save_and_apply(&new, None).await?;
    /// ```
    pub fn calculations(&self) -> CalculationRepository {
        CalculationRepository::new(self.pool.clone())
    }

    /// The only writer of `quotes.total`.
    pub fn totals(&self) -> QuoteTotalsAggregator {
        QuoteTotalsAggregator::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing quote database");
        self.pool.close().await;
    }

    /// `true` when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let status = migrations::migration_status(db.pool()).await.unwrap();

        assert!(status.embedded >= 1);
        assert!(status.is_current());
    }

    #[tokio::test]
    async fn test_schema_survives_between_calls() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.quotes()
            .create("Q-1", "Acme", lathe_core::QuoteStatus::Draft)
            .await
            .unwrap();

        assert_eq!(db.quotes().list(10).await.unwrap().len(), 1);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/lathe.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
