//! Part endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use lathe_core::QuotePart;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/quotes/{quote_id}/parts",
        get(list_parts).post(create_part),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartRequest {
    pub name: String,
    /// Drawing tolerance as printed, e.g. `"±0.005"`.
    #[serde(default)]
    pub tolerance: Option<String>,
}

pub async fn create_part(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
    payload: Result<Json<CreatePartRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<QuotePart>)> {
    let Json(request) = payload?;
    let part = state
        .db
        .parts()
        .create(quote_id, &request.name, request.tolerance.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(part)))
}

pub async fn list_parts(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
) -> ApiResult<Json<Vec<QuotePart>>> {
    // 404 rather than an empty list for unknown quotes
    state.db.quotes().get(quote_id).await?;
    let parts = state.db.parts().list_for_quote(quote_id).await?;
    Ok(Json(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use lathe_core::{QuoteAction, QuoteStatus};

    fn part(name: &str, tolerance: Option<&str>) -> CreatePartRequest {
        CreatePartRequest {
            name: name.to_string(),
            tolerance: tolerance.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_parts() {
        let state = AppState::for_tests().await;
        let quote = state
            .db
            .quotes()
            .create("Q-100", "Acme", QuoteStatus::Draft)
            .await
            .unwrap();

        for (name, tolerance) in [("Bracket", Some("±0.010")), ("Housing", None)] {
            let (code, _) = create_part(
                State(state.clone()),
                Path(quote.id),
                Ok(Json(part(name, tolerance))),
            )
            .await
            .unwrap();
            assert_eq!(code, StatusCode::CREATED);
        }

        let Json(parts) = list_parts(State(state), Path(quote.id)).await.unwrap();
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Bracket", "Housing"]);
        assert_eq!(parts[0].tolerance.as_deref(), Some("±0.010"));
        assert_eq!(parts[1].tolerance, None);
    }

    #[tokio::test]
    async fn test_locked_quote_rejects_new_parts() {
        let state = AppState::for_tests().await;
        let quote = state
            .db
            .quotes()
            .create("Q-101", "Acme", QuoteStatus::Draft)
            .await
            .unwrap();
        state.db.quotes().apply_action(quote.id, QuoteAction::Send).await.unwrap();

        let err = create_part(State(state), Path(quote.id), Ok(Json(part("Cap", None))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::QuoteLocked);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let state = AppState::for_tests().await;
        let quote = state
            .db
            .quotes()
            .create("Q-102", "Acme", QuoteStatus::Draft)
            .await
            .unwrap();

        let err = create_part(State(state), Path(quote.id), Ok(Json(part("  ", None))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
