//! Liveness plus a database round trip.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use lathe_db::migrations::migration_status;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub migrations_current: bool,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let migrations_current = match migration_status(state.db.pool()).await {
        Ok(status) => status.is_current(),
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            false
        }
    };

    let healthy = database && migrations_current;
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database,
            migrations_current,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_ok() {
        let state = AppState::for_tests().await;
        let (code, Json(body)) = health(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert!(body.database);
        assert!(body.migrations_current);
    }

    #[tokio::test]
    async fn test_health_degraded_after_close() {
        let state = AppState::for_tests().await;
        state.db.close().await;
        let (code, Json(body)) = health(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.database);
    }
}
