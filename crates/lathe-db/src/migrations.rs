//! # Database Migrations
//!
//! SQL migrations embedded into the binary at compile time.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new(config)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run_migrations(pool)                                                   │
//! │       │                                                                 │
//! │       ├── _sqlx_migrations missing? create it                           │
//! │       ├── 001_initial_schema.sql   ✓ applied                            │
//! │       └── 002_*.sql                ⬜ pending → run in its own tx        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Server starts accepting requests                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Add `migrations/sqlite/NNN_description.sql` with the next number
//! 2. **NEVER** edit an applied migration; add a new one
//! 3. Money and multiplier columns are TEXT decimals, never REAL

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Everything under `migrations/sqlite`, embedded by `sqlx::migrate!`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in filename order. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(embedded = MIGRATOR.migrations.len(), "Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied");
    Ok(())
}

/// Embedded vs applied migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    /// Every embedded migration has been applied.
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Reads [`MigrationStatus`], for the health endpoint.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or_default(),
    })
}
