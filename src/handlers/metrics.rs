use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::app::AppError;

use super::state::AppState;

const RECENT_TRANSACTIONS: usize = 20;

pub async fn get_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .store
        .get_system_stats()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let recent = state
        .store
        .get_transactions(RECENT_TRANSACTIONS, 0)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let processors = state
        .store
        .get_all_processors()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(json!({
        "stats": stats,
        "recentTransactions": recent,
        "processors": processors,
        "circuitBreakers": state.breaker.get_status(),
    })))
}
