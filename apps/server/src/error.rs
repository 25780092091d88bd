//! # API Error Types
//!
//! What HTTP clients see when something goes wrong.
//!
//! ## Error Flow
//! ```text
//! CoreError / DbError  →  ApiError { code, message }  →  JSON + status
//! ```
//!
//! The machine-readable `code` is stable; clients branch on it, never on
//! the message. The expired-stock case gets its own code so terminals can
//! offer the sell-expired confirmation flow.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use bodega_core::CoreError;
use bodega_db::DbError;

/// Machine-readable error codes for the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    /// Non-expired stock can't cover the sale but expired stock could;
    /// resubmit with `allowExpired` after operator confirmation.
    InsufficientValidStock,
    InvalidPayment,
    NotFound,
    Unauthorized,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::InsufficientValidStock
            | ErrorCode::InvalidPayment => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serialized error envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// 401 for requests missing the acting-user header.
    pub fn unauthorized() -> Self {
        ApiError::new(ErrorCode::Unauthorized, "x-user-id header is required")
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, what)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        (status, Json(self)).into_response()
    }
}

/// Maps engine errors onto the wire contract.
///
/// Business rejections are 400s with a specific code; storage and
/// infrastructure failures are a generic 500 so internals don't leak.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { entity, id } => {
                ApiError::not_found(format!("{entity} not found: {id}"))
            }
            DbError::InsufficientStock { .. } | DbError::InsufficientBatchStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            other => {
                tracing::error!(error = %other, "Unexpected database error");
                ApiError::new(ErrorCode::InternalError, "internal error")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_)
            | CoreError::QuantityTooLarge { .. }
            | CoreError::ProductNotFound(_)
            | CoreError::ServiceNotFound(_)
            | CoreError::ProductInactive(_)
            | CoreError::ServiceInactive(_)
            | CoreError::SaleNotFound(_)
            | CoreError::InvalidSaleStatus { .. } => ErrorCode::ValidationError,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InsufficientValidStock { .. } => ErrorCode::InsufficientValidStock,
            CoreError::InvalidPaymentAmount { .. } => ErrorCode::InvalidPayment,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
