use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::EngineError;

/// HTTP-facing wrapper over `EngineError`, same shape as the teacher's own
/// `ApiError` (§7 maps engine error kinds onto HTTP status codes; a bare
/// `AlreadyProcessed` renders as a 200 success, per §7's "successful no-op"
/// rule, rather than as an error).
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    AlreadyProcessed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            ApiError::AlreadyProcessed(reason) => (
                StatusCode::OK,
                json!({ "success": true, "reason": "already_processed", "detail": reason }),
            ),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AlreadyProcessed(msg) => ApiError::AlreadyProcessed(msg),
            EngineError::NotFound(msg) => ApiError::NotFound(msg),
            EngineError::Validation(msg) => ApiError::BadRequest(msg),
            EngineError::InsufficientBalance { user_id, available, needed } => ApiError::Conflict(format!(
                "user {user_id} has insufficient balance: available {available}, needed {needed}"
            )),
            EngineError::InsufficientStock(msg) => ApiError::Conflict(msg),
            EngineError::InsufficientPool(msg) => ApiError::Conflict(msg),
            EngineError::Conflict(msg) => ApiError::Conflict(msg),
            EngineError::Fatal(msg) => ApiError::Internal(msg),
            EngineError::Store(e) => ApiError::Internal(format!("{e}")),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}
