use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::app::AppError;

use super::state::AppState;

pub async fn get_priorities(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let priorities = state.priority_source.get_priorities().await;
    Ok(Json(priorities))
}
