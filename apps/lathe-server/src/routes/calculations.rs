//! # Calculation Endpoints
//!
//! The calculator's save path and the per-quote record list.
//!
//! ## Save Workflow
//! ```text
//! POST /api/quotes/{id}/calculations
//!      │
//!      ├── body quoteId ≠ URL id            → 400
//!      ├── into_new_calculation (validate, price with the server's rates)
//!      ├── submitted derived fields differ  → warn!, computed values win
//!      │
//!      ▼
//! save_and_apply (one transaction)
//!      ├── quote not Rfq/Draft              → 409 QUOTE_LOCKED
//!      ├── expectedVersion stale            → 409 CONFLICT
//!      └── ok → { calculation, lineItem, total }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use lathe_core::{CalculationRecord, Money, QuoteLineItem, SaveCalculationRequest};
use lathe_db::SavedCalculation;
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/quotes/{quote_id}/calculations",
        get(list_calculations).post(save_calculation),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCalculationResponse {
    pub calculation: CalculationRecord,
    /// `null` for a part with no line item.
    pub line_item: Option<QuoteLineItem>,
    pub total: Money,
}

impl From<SavedCalculation> for SaveCalculationResponse {
    fn from(saved: SavedCalculation) -> Self {
        SaveCalculationResponse {
            calculation: saved.calculation,
            line_item: saved.line_item,
            total: saved.total,
        }
    }
}

pub async fn save_calculation(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
    payload: Result<Json<SaveCalculationRequest>, JsonRejection>,
) -> ApiResult<Json<SaveCalculationResponse>> {
    let Json(request) = payload?;

    if let Some(body_quote_id) = request.quote_id {
        if body_quote_id != quote_id {
            return Err(ApiError::validation(format!(
                "quoteId {} does not match quote {}",
                body_quote_id, quote_id
            )));
        }
    }

    let expected_version = request.expected_version;
    let new = request.clone().into_new_calculation(quote_id, &state.rates)?;

    let mismatches = request.derived_mismatches(&new.breakdown);
    if !mismatches.is_empty() {
        warn!(
            quote_id,
            fields = ?mismatches,
            final_price = %new.breakdown.final_price,
            "Submitted derived values disagree with the engine; storing computed values"
        );
    }

    let saved = state
        .db
        .calculations()
        .save_and_apply(&new, expected_version)
        .await?;

    Ok(Json(saved.into()))
}

/// Current record per slot, parts first.
pub async fn list_calculations(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
) -> ApiResult<Json<Vec<CalculationRecord>>> {
    state.db.quotes().get(quote_id).await?;
    let records = state.db.calculations().latest_for_quote(quote_id).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use lathe_core::{QuoteAction, QuoteStatus};
    use lathe_db::NewLineItem;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    struct Fixture {
        state: AppState,
        quote_id: i64,
        part_id: String,
        line_item_id: i64,
    }

    async fn fixture() -> Fixture {
        let state = AppState::for_tests().await;
        let quote = state
            .db
            .quotes()
            .create("Q-2001", "Northwind Aerospace", QuoteStatus::Draft)
            .await
            .unwrap();
        let part = state
            .db
            .parts()
            .create(quote.id, "Valve Body", Some("0.002"))
            .await
            .unwrap();
        let line = state
            .db
            .line_items()
            .create(&NewLineItem {
                quote_id: quote.id,
                quote_part_id: Some(part.id.clone()),
                description: "Valve Body".to_string(),
                quantity: 1,
                unit_price: Money::zero(),
            })
            .await
            .unwrap();

        Fixture {
            state,
            quote_id: quote.id,
            part_id: part.id,
            line_item_id: line.line_item.id,
        }
    }

    impl Fixture {
        async fn save(&self, body: Value) -> ApiResult<SaveCalculationResponse> {
            let request: SaveCalculationRequest = serde_json::from_value(body).unwrap();
            let Json(response) =
                save_calculation(State(self.state.clone()), Path(self.quote_id), Ok(Json(request)))
                    .await?;
            Ok(response)
        }

        fn body(&self, extra: Value) -> Value {
            let mut body = json!({
                "quotePartId": self.part_id,
                "quoteLineItemId": self.line_item_id,
                "toolpathGrandTotal": "100",
                "smallThreadCount": 2,
                "complexityMultiplier": "2.15",
                "toleranceMultiplier": "1.0",
            });
            if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
                for (key, value) in extra {
                    body.insert(key.clone(), value.clone());
                }
            }
            body
        }
    }

    #[tokio::test]
    async fn test_save_returns_record_line_item_and_total() {
        let f = fixture().await;
        let saved = f.save(f.body(json!({}))).await.unwrap();

        assert_eq!(saved.calculation.final_price, Money::new(dec!(218.87)));
        assert_eq!(saved.calculation.version, 1);
        assert_eq!(
            saved.line_item.map(|item| item.unit_price),
            Some(Money::new(dec!(218.87)))
        );
        assert_eq!(saved.total, Money::new(dec!(218.87)));
    }

    #[tokio::test]
    async fn test_tooling_added_after_multipliers() {
        let f = fixture().await;
        let saved = f.save(f.body(json!({ "toolingCost": 50 }))).await.unwrap();

        assert_eq!(saved.calculation.tooling_markup, Some(Money::new(dec!(75))));
        assert_eq!(saved.calculation.final_price, Money::new(dec!(293.87)));
    }

    #[tokio::test]
    async fn test_client_derived_values_are_ignored() {
        let f = fixture().await;
        let saved = f
            .save(f.body(json!({ "finalPrice": "1.00", "basePrice": "999" })))
            .await
            .unwrap();
        assert_eq!(saved.calculation.final_price, Money::new(dec!(218.87)));
    }

    #[tokio::test]
    async fn test_mismatched_quote_id_rejected() {
        let f = fixture().await;
        let err = f
            .save(f.body(json!({ "quoteId": f.quote_id + 1 })))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_missing_slot_rejected() {
        let f = fixture().await;
        let err = f
            .save(json!({ "toolpathGrandTotal": "100" }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_out_of_range_multiplier_rejected() {
        let f = fixture().await;
        let err = f
            .save(f.body(json!({ "complexityMultiplier": "9" })))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let f = fixture().await;
        f.save(f.body(json!({ "expectedVersion": 0 }))).await.unwrap();

        let err = f
            .save(f.body(json!({ "expectedVersion": 0 })))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let saved = f.save(f.body(json!({ "expectedVersion": 1 }))).await.unwrap();
        assert_eq!(saved.calculation.version, 2);
    }

    #[tokio::test]
    async fn test_locked_quote() {
        let f = fixture().await;
        f.state
            .db
            .quotes()
            .apply_action(f.quote_id, QuoteAction::Send)
            .await
            .unwrap();

        let err = f.save(f.body(json!({}))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuoteLocked);

        let Json(records) = list_calculations(State(f.state.clone()), Path(f.quote_id))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_calculations() {
        let f = fixture().await;
        f.save(f.body(json!({}))).await.unwrap();

        let Json(records) = list_calculations(State(f.state.clone()), Path(f.quote_id))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quote_part_id.as_deref(), Some(f.part_id.as_str()));

        let err = list_calculations(State(f.state), Path(9_999)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
