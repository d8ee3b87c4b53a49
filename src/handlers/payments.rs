use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppError;
use crate::models::PaymentRequest;

use super::state::AppState;

pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.engine.process_payment(request, None).await?;
    let transaction = &result.transaction;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "transactionId": transaction.id,
            "amount": transaction.amount.to_string(),
            "currency": transaction.currency,
            "status": "success",
            "processorUsed": result.processor_used,
            "processingTime": result.total_processing_time_ms,
            "createdAt": transaction.created_at,
        })),
    ))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state
        .store
        .get_transaction(id)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or(AppError::NotFound)?;

    Ok(Json(transaction))
}
