//! # Application State
//!
//! Shared by every handler through axum's `State` extractor. Both fields
//! are cheap to clone: `Database` wraps a pool, the rate table sits
//! behind an `Arc`.

use std::sync::Arc;

use lathe_core::pricing::RateTable;
use lathe_db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub rates: Arc<RateTable>,
}

impl AppState {
    pub fn new(db: Database, rates: RateTable) -> Self {
        AppState {
            db,
            rates: Arc::new(rates),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Fresh in-memory database with the default rate table.
    pub(crate) async fn for_tests() -> Self {
        let db = Database::new(lathe_db::DbConfig::in_memory())
            .await
            .expect("in-memory database");
        AppState::new(db, RateTable::default())
    }
}
