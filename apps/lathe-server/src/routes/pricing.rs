//! Stateless pricing endpoints: live preview, rate table and tolerance
//! suggestions. Nothing here touches the database.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use lathe_core::pricing::{
    parse_tolerance, suggest_tolerance_multiplier, PriceBreakdown, PricingConfiguration,
    PricingInput, PricingRuleEngine, RateTable,
};
use lathe_core::Multiplier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pricing/preview", post(preview))
        .route("/pricing/rates", get(rates))
        .route("/pricing/tolerance-default", get(tolerance_default))
}

// =============================================================================
// Preview
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// The inputs after coercion, as the engine saw them.
    pub configuration: PricingConfiguration,
    pub breakdown: PriceBreakdown,
}

/// Prices whatever the calculator form currently holds.
///
/// Never fails on field values: blanks and junk are coerced (see
/// [`PricingInput`]). Only a body that isn't JSON at all is rejected.
pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PricingInput>, JsonRejection>,
) -> ApiResult<Json<PreviewResponse>> {
    let Json(input) = payload?;
    let configuration = input.into_configuration(&state.rates);
    let breakdown = PricingRuleEngine::calculate(&configuration);

    Ok(Json(PreviewResponse {
        configuration,
        breakdown,
    }))
}

pub async fn rates(State(state): State<AppState>) -> Json<RateTable> {
    Json(*state.rates)
}

// =============================================================================
// Tolerance Default
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ToleranceQuery {
    pub tolerance: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceDefaultResponse {
    pub tolerance: Option<String>,
    /// Absolute tolerance read from the text, in inches.
    pub parsed: Option<Decimal>,
    /// `null` when the text has no usable number.
    pub multiplier: Option<Multiplier>,
}

pub async fn tolerance_default(
    query: Result<Query<ToleranceQuery>, QueryRejection>,
) -> ApiResult<Json<ToleranceDefaultResponse>> {
    let Query(query) = query?;
    let parsed = query.tolerance.as_deref().and_then(parse_tolerance);
    let multiplier = suggest_tolerance_multiplier(query.tolerance.as_deref());

    Ok(Json(ToleranceDefaultResponse {
        tolerance: query.tolerance,
        parsed,
        multiplier,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_core::Money;
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn preview_json(body: serde_json::Value) -> PreviewResponse {
        let state = AppState::for_tests().await;
        let input: PricingInput = serde_json::from_value(body).unwrap();
        let Json(response) = preview(State(state), Ok(Json(input))).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_preview_prices_form_values() {
        let response = preview_json(json!({
            "toolpathGrandTotal": "100",
            "leadTimeMultiplier": 1.0,
            "complexityMultiplier": "2.15",
            "toleranceMultiplier": 1,
            "threadCounts": { "small": "2" },
        }))
        .await;

        assert_eq!(response.breakdown.thread_cost, Money::new(dec!(1.80)));
        assert_eq!(response.breakdown.final_price, Money::new(dec!(218.87)));
    }

    #[tokio::test]
    async fn test_preview_tolerates_blank_and_junk() {
        let response = preview_json(json!({
            "toolpathGrandTotal": "",
            "complexityMultiplier": "lots",
            "threadCounts": { "small": null, "medium": "abc" },
            "toolingEnabled": true,
            "toolingCost": "50",
        }))
        .await;

        assert_eq!(response.configuration.toolpath_grand_total, Money::zero());
        assert_eq!(response.configuration.complexity_multiplier.value(), dec!(2.15));
        assert_eq!(response.breakdown.tooling_markup, Money::new(dec!(75)));
        assert_eq!(response.breakdown.final_price, Money::new(dec!(75)));
    }

    #[tokio::test]
    async fn test_preview_uses_part_tolerance_suggestion() {
        let response = preview_json(json!({
            "toolpathGrandTotal": 100,
            "partTolerance": "±0.002",
        }))
        .await;

        assert_eq!(response.configuration.tolerance_multiplier.value(), dec!(1.5));
    }

    #[tokio::test]
    async fn test_rates_returns_configured_table() {
        let state = AppState::for_tests().await;
        let Json(table) = rates(State(state)).await;
        assert_eq!(table, RateTable::default());
    }

    #[tokio::test]
    async fn test_tolerance_default() {
        let query = ToleranceQuery {
            tolerance: Some("±0.002".to_string()),
        };
        let Json(response) = tolerance_default(Ok(Query(query))).await.unwrap();
        assert_eq!(response.parsed, Some(dec!(0.002)));
        assert_eq!(response.multiplier.map(|m| m.value()), Some(dec!(1.5)));

        let Json(response) = tolerance_default(Ok(Query(ToleranceQuery::default())))
            .await
            .unwrap();
        assert_eq!(response.multiplier, None);
    }
}
