//! Line item endpoints. Every write answers with the new quote total.
//!
//! Quantity and unit price arrive as whatever the form holds, so they are
//! read leniently here and rejected with the form's own wording
//! ("Please enter a valid quantity") when they can't be used.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use lathe_core::pricing::input::coerce_decimal;
use lathe_core::{Money, QuoteLineItem, ValidationError};
use lathe_db::{LineItemChange, LineItemUpdate, NewLineItem};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::routes::quotes::TotalResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes/{quote_id}/line-items", post(create_line_item))
        .route(
            "/quotes/{quote_id}/line-items/{line_item_id}",
            put(update_line_item).delete(delete_line_item),
        )
}

/// Body for both create and update. On update, absent fields keep their
/// stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineItemRequest {
    pub quote_part_id: Option<String>,
    pub description: Option<String>,
    pub quantity: Value,
    pub unit_price: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub line_item: QuoteLineItem,
    pub total: Money,
}

impl From<LineItemChange> for LineItemResponse {
    fn from(change: LineItemChange) -> Self {
        LineItemResponse {
            line_item: change.line_item,
            total: change.total,
        }
    }
}

pub async fn create_line_item(
    State(state): State<AppState>,
    Path(quote_id): Path<i64>,
    payload: Result<Json<LineItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LineItemResponse>)> {
    let Json(request) = payload?;

    let quantity = read_quantity(&request.quantity)?.ok_or_else(|| invalid("quantity"))?;
    let unit_price = read_price(&request.unit_price)?.unwrap_or_default();

    let change = state
        .db
        .line_items()
        .create(&NewLineItem {
            quote_id,
            quote_part_id: request.quote_part_id.filter(|id| !id.trim().is_empty()),
            description: request.description.unwrap_or_default(),
            quantity,
            unit_price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(change.into())))
}

pub async fn update_line_item(
    State(state): State<AppState>,
    Path((quote_id, line_item_id)): Path<(i64, i64)>,
    payload: Result<Json<LineItemRequest>, JsonRejection>,
) -> ApiResult<Json<LineItemResponse>> {
    let Json(request) = payload?;

    let changes = LineItemUpdate {
        description: request.description,
        quantity: read_quantity(&request.quantity)?,
        unit_price: read_price(&request.unit_price)?,
    };

    let change = state
        .db
        .line_items()
        .update(quote_id, line_item_id, &changes)
        .await?;

    Ok(Json(change.into()))
}

pub async fn delete_line_item(
    State(state): State<AppState>,
    Path((quote_id, line_item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<TotalResponse>> {
    let total = state.db.line_items().soft_delete(quote_id, line_item_id).await?;
    Ok(Json(TotalResponse { quote_id, total }))
}

// =============================================================================
// Form Values
// =============================================================================

fn invalid(field: &str) -> ValidationError {
    ValidationError::InvalidAmount {
        field: field.to_string(),
    }
}

/// `None` when absent; whole numbers only.
fn read_quantity(value: &Value) -> Result<Option<i64>, ValidationError> {
    if value.is_null() {
        return Ok(None);
    }

    coerce_decimal(value)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i64())
        .map(Some)
        .ok_or_else(|| invalid("quantity"))
}

/// `None` when absent or blank.
fn read_price(value: &Value) -> Result<Option<Money>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        _ => coerce_decimal(value)
            .map(|d| Some(Money::new(d)))
            .ok_or_else(|| invalid("price")),
    }
}
