//! # lathe-db: Database Layer for Lathe
//!
//! SQLite storage for quotes, parts, line items and calculations, using
//! sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lathe Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (save_calculation)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lathe-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ QuoteRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PartRepo      │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ LineItemRepo  │    │              │  │   │
//! │  │   │ Management    │    │ CalculationRepo│   │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                              │   │
//! │  │                        ┌───────▼────────┐                     │   │
//! │  │                        │  Aggregator    │  sole writer of     │   │
//! │  │                        │ (quote totals) │  quotes.total       │   │
//! │  │                        └────────────────┘                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Quote, part, line item and calculation repositories
//! - [`aggregator`] - Quote totals
//! - [`codec`] - TEXT ↔ decimal column conversion
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lathe_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("lathe.db")).await?;
//!
//! let new = request.into_new_calculation(quote_id, &rates)?;
//! let saved = db.calculations().save_and_apply(&new, None).await?;
//! println!("quote total is now {}", saved.total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod codec;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregator::QuoteTotalsAggregator;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CalculationRepository, LineItemChange, LineItemRepository, LineItemUpdate, NewLineItem,
    PartRepository, QuoteRepository, SavedCalculation,
};
