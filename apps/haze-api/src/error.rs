//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Haze Ledger                            │
//! │                                                                         │
//! │  Handler                                                               │
//! │  Result<Json<T>, ApiError>                                             │
//! │       │                                                                 │
//! │       ├── ValidationError ─────────────────────────► 400               │
//! │       ├── JsonRejection / QueryRejection ───────────► 400              │
//! │       ├── CoreError (split, overpayment, pricing) ──► 400              │
//! │       ├── CoreError (stock, last admin) ────────────► 409              │
//! │       ├── DbError::NotFound / *NotFound ────────────► 404              │
//! │       ├── DbError::UniqueViolation / InUse ─────────► 409              │
//! │       ├── missing / bad token ──────────────────────► 401              │
//! │       ├── staff on an admin route ──────────────────► 403              │
//! │       └── anything else ───── logged with error! ───► 500              │
//! │                                                                         │
//! │  Body: { "error": "...", "code": "CONFLICT", "details": {...}|null }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged server-side and returned with a generic
//! message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use haze_core::{CoreError, ValidationError};
use haze_db::DbError;
use serde::Serialize;
use serde_json::{json, Value};

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// if (!res.ok) {
///   const e = await res.json();
///   switch (e.code) {
///     case 'INSUFFICIENT_STOCK':
///       showStockWarning(e.details);
///       break;
///     case 'VALIDATION_ERROR':
///       showForm(e.error);
///       break;
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Payment split or settlement rejected (400)
    PaymentError,

    /// Missing, expired or invalid credentials (401)
    Unauthorized,

    /// Authenticated but not allowed (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Duplicate or still referenced (409)
    Conflict,

    /// Not enough derived stock (409)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::PaymentError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict | ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "error": "Insufficient stock for Mango Ice 30ml: available 2, requested 5",
///   "code": "INSUFFICIENT_STOCK",
///   "details": { "product": "Mango Ice 30ml", "available": 2, "requested": 5 }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable error message for display
    pub error: String,

    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Structured context, when there is any
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            error: message.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.error)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Body that is not JSON, or JSON that does not fit the request type.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
            .with_details(json!({ "source": "body", "status": rejection.status().as_u16() }))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text()).with_details(json!({ "source": "query" }))
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string()).with_details(json!({ "field": err.field() }))
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(_) | CoreError::SaleNotFound(_) => {
                ApiError::new(ErrorCode::NotFound, message)
            }
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "product": product,
                "available": available,
                "requested": requested,
            })),
            CoreError::SplitMismatch { total, allocated } => {
                ApiError::new(ErrorCode::PaymentError, message).with_details(json!({
                    "totalCents": total.cents(),
                    "allocatedCents": allocated.cents(),
                }))
            }
            CoreError::Overpayment {
                outstanding,
                offered,
            } => ApiError::new(ErrorCode::PaymentError, message).with_details(json!({
                "outstandingCents": outstanding.cents(),
                "offeredCents": offered.cents(),
            })),
            CoreError::NothingOutstanding(_) => ApiError::new(ErrorCode::Conflict, message),
            CoreError::CapitalWithDue => ApiError::new(ErrorCode::PaymentError, message),
            CoreError::CostAboveSellingPrice { .. }
            | CoreError::EmptySale
            | CoreError::TooManyItems { .. } => ApiError::validation(message),
            CoreError::LastAdmin => ApiError::new(ErrorCode::Conflict, message),
            CoreError::InvalidCredentials => ApiError::unauthorized(message),
            CoreError::Validation(e) => e.into(),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{field} '{value}' already exists"),
            )
            .with_details(json!({ "field": field })),
            DbError::InUse { entity, id, reason } => ApiError::new(
                ErrorCode::Conflict,
                format!("{entity} {id} cannot be removed: {reason}"),
            ),
            DbError::Rule(e) => e.into(),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::Conflict, "Invalid or still referenced record")
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
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}
