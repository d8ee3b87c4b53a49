use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::app::AppError;

use super::state::AppState;

pub async fn get_health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .health
        .snapshot()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(snapshot))
}
