//! Calculator walk for a quote, rebuilt from the database on every fetch.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use lathe_core::{CalculatorSession, QuoteStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/quotes/{quote_id}/calculator", get(calculator))
}

#[derive(Debug, Default, Deserialize)]
pub struct CalculatorQuery {
    /// Start at the first never-priced entry instead of the first entry.
    #[serde(default)]
    pub resume: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorResponse {
    #[serde(flatten)]
    pub session: CalculatorSession,
    pub status: QuoteStatus,
    /// `false` once the quote is sent; saves will be refused.
    pub editable: bool,
    pub priced_count: usize,
    pub finished: bool,
}

pub async fn calculator(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
    query: Result<Query<CalculatorQuery>, QueryRejection>,
) -> ApiResult<Json<CalculatorResponse>> {
    let Query(query) = query?;

    let quote = state.db.quotes().get(quote_id).await?;
    let parts = state.db.parts().list_for_quote(quote_id).await?;
    let line_items = state.db.line_items().list_for_quote(quote_id, false).await?;
    let records = state.db.calculations().latest_for_quote(quote_id).await?;

    let mut session =
        CalculatorSession::build(quote_id, &parts, &line_items, &records, &state.rates);
    if query.resume {
        session.seek_first_unpriced();
    }

    Ok(Json(CalculatorResponse {
        status: quote.status,
        editable: quote.status.is_editable(),
        priced_count: session.priced_count(),
        finished: session.is_finished(),
        session,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use lathe_core::pricing::PricingConfiguration;
    use lathe_core::{ConfigurationSource, Money, Multiplier, NewCalculation};
    use lathe_db::NewLineItem;
    use rust_decimal_macros::dec;

    async fn quote_with_parts(state: &AppState, parts: &[(&str, &str)]) -> (i64, Vec<(String, i64)>) {
        let quote = state
            .db
            .quotes()
            .create("Q-3001", "Cascade Robotics", QuoteStatus::Draft)
            .await
            .unwrap();

        let mut slots = Vec::new();
        for (name, tolerance) in parts {
            let part = state.db.parts().create(quote.id, name, Some(tolerance)).await.unwrap();
            let line = state
                .db
                .line_items()
                .create(&NewLineItem {
                    quote_id: quote.id,
                    quote_part_id: Some(part.id.clone()),
                    description: name.to_string(),
                    quantity: 1,
                    unit_price: Money::zero(),
                })
                .await
                .unwrap();
            slots.push((part.id, line.line_item.id));
        }
        (quote.id, slots)
    }

    async fn fetch(state: &AppState, quote_id: i64, resume: bool) -> ApiResult<CalculatorResponse> {
        let Json(response) = calculator(
            State(state.clone()),
            Path(quote_id),
            Ok(Query(CalculatorQuery { resume })),
        )
        .await?;
        Ok(response)
    }

    #[tokio::test]
    async fn test_stored_override_wins_over_suggestion() {
        let state = AppState::for_tests().await;
        let (quote_id, slots) = quote_with_parts(&state, &[("Valve Body", "0.002")]).await;

        let fresh = fetch(&state, quote_id, false).await.unwrap();
        let entry = &fresh.session.entries[0];
        assert_eq!(entry.source, ConfigurationSource::Defaulted);
        assert_eq!(entry.configuration.tolerance_multiplier.value(), dec!(1.5));

        let mut config = PricingConfiguration::defaults(&state.rates);
        config.toolpath_grand_total = Money::new(dec!(100));
        config.tolerance_multiplier = Multiplier::new(dec!(1.0));
        let (part_id, line_item_id) = slots[0].clone();
        let new = NewCalculation::price(quote_id, Some(part_id), Some(line_item_id), config).unwrap();
        state.db.calculations().save_and_apply(&new, None).await.unwrap();

        let reloaded = fetch(&state, quote_id, false).await.unwrap();
        let entry = &reloaded.session.entries[0];
        assert_eq!(entry.source, ConfigurationSource::Stored);
        assert_eq!(entry.version, 1);
        assert_eq!(entry.configuration.tolerance_multiplier.value(), dec!(1.0));
        assert_eq!(entry.suggested_tolerance_multiplier.map(|m| m.value()), Some(dec!(1.5)));
        assert_eq!(reloaded.priced_count, 1);
    }

    #[tokio::test]
    async fn test_resume_skips_priced_parts() {
        let state = AppState::for_tests().await;
        let (quote_id, slots) =
            quote_with_parts(&state, &[("Bracket", "±0.010"), ("Housing", "±0.005")]).await;

        let (part_id, line_item_id) = slots[0].clone();
        let new = NewCalculation::price(
            quote_id,
            Some(part_id),
            Some(line_item_id),
            PricingConfiguration::defaults(&state.rates),
        )
        .unwrap();
        state.db.calculations().save_and_apply(&new, None).await.unwrap();

        let from_start = fetch(&state, quote_id, false).await.unwrap();
        assert_eq!(from_start.session.cursor, 0);

        let resumed = fetch(&state, quote_id, true).await.unwrap();
        assert_eq!(resumed.session.cursor, 1);
        assert!(!resumed.finished);
        assert!(resumed.editable);
    }

    #[tokio::test]
    async fn test_unknown_quote() {
        let state = AppState::for_tests().await;
        let err = fetch(&state, 42, false).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
