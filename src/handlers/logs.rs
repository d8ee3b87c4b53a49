use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use crate::app::AppError;
use crate::models::LogLevel;

use super::state::AppState;

const MAX_LOGS_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
    level: Option<LogLevel>,
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(MAX_LOGS_LIMIT).min(MAX_LOGS_LIMIT);

    let logs = state
        .store
        .get_system_logs(limit, query.level)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(logs))
}
