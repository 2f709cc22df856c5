//! # HTTP Routes
//!
//! One module per resource, each exposing `router()`.
//!
//! ```text
//! GET    /health
//! POST   /api/pricing/preview
//! GET    /api/pricing/rates
//! GET    /api/pricing/tolerance-default?tolerance=±0.005
//! GET    /api/quotes                             POST /api/quotes
//! GET    /api/quotes/{id}
//! POST   /api/quotes/{id}/status
//! POST   /api/quotes/{id}/recompute
//! GET    /api/quotes/{id}/parts                  POST /api/quotes/{id}/parts
//! POST   /api/quotes/{id}/line-items
//! PUT    /api/quotes/{id}/line-items/{itemId}    DELETE (same path)
//! GET    /api/quotes/{id}/calculations           POST (same path)
//! GET    /api/quotes/{id}/calculator
//! ```

use axum::Router;

use crate::state::AppState;

pub mod calculations;
pub mod calculator;
pub mod health;
pub mod line_items;
pub mod parts;
pub mod pricing;
pub mod quotes;

/// All routes, without state.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(pricing::router())
        .merge(quotes::router())
        .merge(parts::router())
        .merge(line_items::router())
        .merge(calculations::router())
        .merge(calculator::router());

    Router::new().merge(health::router()).nest("/api", api)
}
