use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::app::AppError;

use super::state::AppState;

/// Runs a live health check against every configured adapter (distinct
/// from `/api/health`, which is a pure reader over cached state) and
/// returns the composite result.
pub async fn run_health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let processors = state
        .store
        .get_all_processors()
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let mut results = Vec::with_capacity(processors.len());
    for processor in &processors {
        let health = match state.registry.get(&processor.processor_type) {
            Some(adapter) => {
                let outcome = adapter.health_check().await;
                json!({
                    "processorId": processor.id,
                    "name": processor.name,
                    "healthy": outcome.healthy,
                    "responseTime": outcome.response_time_ms,
                    "error": outcome.error,
                })
            }
            None => json!({
                "processorId": processor.id,
                "name": processor.name,
                "healthy": false,
                "responseTime": 0,
                "error": "no adapter registered for processor type",
            }),
        };
        results.push(health);
    }

    let all_healthy = results
        .iter()
        .all(|r| r.get("healthy").and_then(|v| v.as_bool()).unwrap_or(false));

    Ok(Json(json!({
        "healthy": all_healthy,
        "processors": results,
    })))
}
