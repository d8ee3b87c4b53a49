use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppError;
use crate::models::ProcessorUpdate;

use super::state::AppState;

pub async fn list_processors(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let processors = state
        .store
        .get_all_processors()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(processors))
}

/// Flips `enabled`. Applying this twice returns the processor to its
/// original state with no other side effect (toggle idempotence, I8).
pub async fn toggle_processor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let current = state
        .store
        .get_processor(id)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or(AppError::NotFound)?;

    let updated = state
        .store
        .update_processor(
            id,
            ProcessorUpdate {
                enabled: Some(!current.enabled),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(json!({
        "id": updated.id,
        "name": updated.name,
        "enabled": updated.enabled,
    })))
}
