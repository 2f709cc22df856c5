//! Quote endpoints: create, read, lifecycle and total recompute.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lathe_core::{Money, Quote, QuoteAction, QuoteLineItem, QuotePart, QuoteStatus, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/{quote_id}", get(get_quote))
        .route("/quotes/{quote_id}/status", post(change_status))
        .route("/quotes/{quote_id}/recompute", post(recompute_total))
}

// =============================================================================
// Create & List
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    pub quote_number: String,
    pub customer_name: String,
    /// `rfq` or `draft`; defaults to `draft`.
    #[serde(default)]
    pub status: QuoteStatus,
}

pub async fn create_quote(
    State(state): State<AppState>,
    payload: Result<Json<CreateQuoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Quote>)> {
    let Json(request) = payload?;

    if !request.status.is_editable() {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["rfq".to_string(), "draft".to_string()],
        }
        .into());
    }

    let quote = state
        .db
        .quotes()
        .create(&request.quote_number, &request.customer_name, request.status)
        .await?;

    info!(quote_id = quote.id, quote_number = %quote.quote_number, "Quote created");
    Ok((StatusCode::CREATED, Json(quote)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_quotes(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Quote>>> {
    let Query(query) = query?;
    let quotes = state.db.quotes().list(query.limit.clamp(1, 500)).await?;
    Ok(Json(quotes))
}

// =============================================================================
// Read
// =============================================================================

/// A quote with its parts and live line items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: Quote,
    pub parts: Vec<QuotePart>,
    pub line_items: Vec<QuoteLineItem>,
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
) -> ApiResult<Json<QuoteDetail>> {
    let quote = state.db.quotes().get(quote_id).await?;
    let parts = state.db.parts().list_for_quote(quote_id).await?;
    let line_items = state.db.line_items().list_for_quote(quote_id, false).await?;

    Ok(Json(QuoteDetail {
        quote,
        parts,
        line_items,
    }))
}

// =============================================================================
// Lifecycle
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub action: QuoteAction,
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<Quote>> {
    let Json(request) = payload?;
    let quote = state.db.quotes().apply_action(quote_id, request.action).await?;
    Ok(Json(quote))
}

// =============================================================================
// Recompute
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalResponse {
    pub quote_id: i64,
    pub total: Money,
}

/// Rewrites the stored total from the live line items. Allowed in any
/// status: it only makes the total agree with what is already there.
pub async fn recompute_total(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
) -> ApiResult<Json<TotalResponse>> {
    let total = state.db.totals().recompute(quote_id).await?;
    Ok(Json(TotalResponse { quote_id, total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use lathe_db::NewLineItem;
    use rust_decimal_macros::dec;

    async fn create(state: &AppState, number: &str, status: QuoteStatus) -> ApiResult<Quote> {
        let request = CreateQuoteRequest {
            quote_number: number.to_string(),
            customer_name: "Acme Fixtures".to_string(),
            status,
        };
        let (code, Json(quote)) = create_quote(State(state.clone()), Ok(Json(request))).await?;
        assert_eq!(code, StatusCode::CREATED);
        Ok(quote)
    }

    #[tokio::test]
    async fn test_create_and_get_quote() {
        let state = AppState::for_tests().await;
        let quote = create(&state, "Q-1001", QuoteStatus::Rfq).await.unwrap();
        assert_eq!(quote.status, QuoteStatus::Rfq);
        assert_eq!(quote.total, Money::zero());

        state.db.parts().create(quote.id, "Bracket", Some("±0.005")).await.unwrap();

        let Json(detail) = get_quote(State(state.clone()), Path(quote.id)).await.unwrap();
        assert_eq!(detail.quote.quote_number, "Q-1001");
        assert_eq!(detail.parts.len(), 1);
        assert!(detail.line_items.is_empty());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["quoteNumber"], "Q-1001");
        assert!(json["lineItems"].is_array());
    }

    #[tokio::test]
    async fn test_create_rejects_locked_status_and_duplicates() {
        let state = AppState::for_tests().await;

        let err = create(&state, "Q-1", QuoteStatus::Sent).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        create(&state, "Q-2", QuoteStatus::Draft).await.unwrap();
        let err = create(&state, "Q-2", QuoteStatus::Draft).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_unknown_quote_is_not_found() {
        let state = AppState::for_tests().await;
        let err = get_quote(State(state), Path(404)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let state = AppState::for_tests().await;
        let quote = create(&state, "Q-7", QuoteStatus::Draft).await.unwrap();

        let send = StatusRequest {
            action: QuoteAction::Send,
        };
        let Json(sent) = change_status(State(state.clone()), Path(quote.id), Ok(Json(send)))
            .await
            .unwrap();
        assert_eq!(sent.status, QuoteStatus::Sent);

        let convert = StatusRequest {
            action: QuoteAction::Convert,
        };
        let err = change_status(State(state), Path(quote.id), Ok(Json(convert)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_recompute_total() {
        let state = AppState::for_tests().await;
        let quote = create(&state, "Q-9", QuoteStatus::Draft).await.unwrap();

        for (description, price) in [("Setup", dec!(100)), ("Machining", dec!(218.87))] {
            state
                .db
                .line_items()
                .create(&NewLineItem {
                    quote_id: quote.id,
                    quote_part_id: None,
                    description: description.to_string(),
                    quantity: 1,
                    unit_price: Money::new(price),
                })
                .await
                .unwrap();
        }

        let Json(first) = recompute_total(State(state.clone()), Path(quote.id)).await.unwrap();
        let Json(second) = recompute_total(State(state), Path(quote.id)).await.unwrap();
        assert_eq!(first.total, Money::new(dec!(318.87)));
        assert_eq!(second.total, first.total);
    }
}
