use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy per the error handling design: validation, decline,
/// adapter fault, configuration, storage, and system errors each carry
/// their own response shape and status code. Circuit-open is not an error
/// — it never reaches this type, it is just a skipped candidate.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("payment declined: {reason}")]
    Declined {
        reason: String,
        attempted_processors: Vec<String>,
        processing_time_ms: u64,
        transaction_id: uuid::Uuid,
    },

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("system error: {0}")]
    System(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Declined {
                reason,
                attempted_processors,
                processing_time_ms,
                transaction_id,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({
                    "success": false,
                    "transactionId": transaction_id,
                    "error": "Payment processing failed",
                    "details": reason,
                    "attemptedProcessors": attempted_processors,
                    "processingTime": processing_time_ms,
                })),
            )
                .into_response(),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not found" })),
            )
                .into_response(),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "storage error" })),
                )
                    .into_response()
            }
            AppError::System(msg) => {
                tracing::error!(error = %msg, "system error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "system error" })),
                )
                    .into_response()
            }
        }
    }
}
