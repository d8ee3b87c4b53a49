use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppError;

use super::state::AppState;

const MAX_TRANSACTIONS_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(MAX_TRANSACTIONS_LIMIT).min(MAX_TRANSACTIONS_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let transactions = state
        .store
        .get_transactions(limit, offset)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let total = state
        .store
        .get_total_transaction_count()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(json!({
        "transactions": transactions,
        "limit": limit,
        "offset": offset,
        "total": total,
    })))
}
