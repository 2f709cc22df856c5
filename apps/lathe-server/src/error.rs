//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Lathe                                  │
//! │                                                                         │
//! │  Handler                                                                │
//! │  Result<Json<T>, ApiError>                                              │
//! │         │                                                               │
//! │         ├── CoreError::Validation      ──► 400 VALIDATION_ERROR         │
//! │         ├── CoreError::QuoteNotFound   ──► 404 NOT_FOUND                │
//! │         ├── CoreError::QuoteLocked     ──► 409 QUOTE_LOCKED             │
//! │         ├── CoreError::StaleCalculation──► 409 CONFLICT                 │
//! │         ├── InvalidStatusTransition    ──► 422 BUSINESS_LOGIC           │
//! │         └── DbError::QueryFailed       ──► 500 DATABASE_ERROR           │
//! │                                            (details logged only)        │
//! │                                                                         │
//! │  Response body:                                                         │
//! │  { "code": "QUOTE_LOCKED",                                              │
//! │    "message": "Quote 42 is sent and can no longer be edited" }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lathe_core::{CoreError, ValidationError};
use lathe_db::DbError;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing request.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Quote not found: 42"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Quote is past the editable statuses (409)
    QuoteLocked,

    /// Stale version or duplicate key (409)
    Conflict,

    /// Business logic error (422)
    BusinessLogic,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::QuoteLocked | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessLogic => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Core(e) => ApiError::from(e),
            DbError::InvalidData {
                entity,
                field,
                value,
            } => {
                tracing::error!(%entity, %field, %value, "Stored value could not be decoded");
                ApiError::new(ErrorCode::DatabaseError, "Stored data is invalid")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::Internal, "Internal server error")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::QuoteNotFound(_)
            | CoreError::PartNotFound(_)
            | CoreError::LineItemNotFound(_) => ErrorCode::NotFound,
            CoreError::QuoteLocked { .. } => ErrorCode::QuoteLocked,
            CoreError::StaleCalculation { .. } => ErrorCode::Conflict,
            CoreError::InvalidStatusTransition { .. } => ErrorCode::BusinessLogic,
            CoreError::MissingPartReference | CoreError::LineItemPartMismatch { .. } => {
                ErrorCode::ValidationError
            }
            CoreError::Validation(e) => return ApiError::from_validation(e),
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from_validation(&err)
    }
}

impl ApiError {
    // The bare message ("Please enter a valid quantity") is what the form shows.
    fn from_validation(err: &ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let locked = ApiError::from(CoreError::QuoteLocked {
            quote_id: 42,
            status: "sent".to_string(),
        });
        assert_eq!(locked.code, ErrorCode::QuoteLocked);
        assert_eq!(locked.code.status(), StatusCode::CONFLICT);
        assert_eq!(locked.message, "Quote 42 is sent and can no longer be edited");

        let stale = ApiError::from(DbError::Core(CoreError::StaleCalculation {
            expected: 1,
            actual: 2,
        }));
        assert_eq!(stale.code, ErrorCode::Conflict);

        let transition = ApiError::from(CoreError::InvalidStatusTransition {
            from: "draft".to_string(),
            action: "accept".to_string(),
        });
        assert_eq!(transition.code.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let mismatch = ApiError::from(CoreError::LineItemPartMismatch {
            line_item_id: 12,
            part_id: "p-1".to_string(),
        });
        assert_eq!(mismatch.code.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(DbError::not_found("Quote", 7));
        assert_eq!(missing.code.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_message_is_bare() {
        let err = ApiError::from(CoreError::Validation(ValidationError::InvalidAmount {
            field: "quantity".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Please enter a valid quantity");
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(DbError::QueryFailed("no such table: quotes".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("quotes"));
    }

    #[test]
    fn test_serialization() {
        let err = ApiError::new(ErrorCode::QuoteLocked, "locked");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":"QUOTE_LOCKED","message":"locked"}"#);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::validation("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
