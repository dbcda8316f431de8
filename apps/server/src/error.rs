//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  handler ── Result<Json<T>, ApiError>                                  │
//! │     │                                                                   │
//! │     ├── bad JSON / query ─── JsonRejection ──────┐                      │
//! │     │                                            │                      │
//! │     ├── ledger refused ──── LedgerError ─────────┼──► ApiError          │
//! │     │                                            │      │               │
//! │     └── Ok ──► 200 / 201 / 204                   │      ▼               │
//! │                                                  │  status + JSON body  │
//! │                                                  │                      │
//! │  { "code": "INSUFFICIENT_STOCK",                                       │
//! │    "message": "Insufficient stock for Drill: available 2, requested 3" }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use toolcrib_core::ValidationError;
use toolcrib_ledger::LedgerError;

/// Body returned for every failed request.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Loan not found: 6c1f..." }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown item or loan (404)
    NotFound,

    /// Missing or malformed input (400)
    ValidationError,

    /// Delete refused while units are on loan (400)
    ItemOnLoan,

    /// Edit would make stock negative (400)
    NegativeStock,

    /// Loan returned twice (409)
    AlreadyReturned,

    /// Checkout exceeds available stock (409)
    InsufficientStock,

    /// Return would exceed the item's total (409)
    StockOverflow,

    /// Store refused to commit; safe to resubmit (503)
    TransactionAborted,

    /// Store failure (500)
    DatabaseError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::ItemOnLoan | ErrorCode::NegativeStock => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::AlreadyReturned
            | ErrorCode::InsufficientStock
            | ErrorCode::StockOverflow => StatusCode::CONFLICT,
            ErrorCode::TransactionAborted => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

/// Converts ledger errors to API errors.
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let code = match &err {
            LedgerError::Validation(_) => ErrorCode::ValidationError,
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::ItemOnLoan { .. } => ErrorCode::ItemOnLoan,
            LedgerError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            LedgerError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            LedgerError::NegativeStock { .. } => ErrorCode::NegativeStock,
            LedgerError::StockOverflow { .. } => ErrorCode::StockOverflow,
            LedgerError::TransactionAborted(_) => {
                return ApiError::new(
                    ErrorCode::TransactionAborted,
                    "The change could not be committed, please try again",
                );
            }
            LedgerError::Store(e) => {
                // Log the actual error but return a generic message
                error!("Store failure: {}", e);
                return ApiError::new(ErrorCode::DatabaseError, "Database operation failed");
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
