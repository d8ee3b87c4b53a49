pub mod health;
pub mod health_check;
pub mod logs;
pub mod metrics;
pub mod payments;
pub mod priorities;
pub mod processors;
pub mod state;
pub mod transactions;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Wires the ten HTTP endpoints plus the push channel. CORS and request
/// tracing are a thin outer `tower` layer — not a reimplementation of a
/// security or rate-limiting policy.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::get_health))
        .route("/api/payments", post(payments::create_payment))
        .route("/api/payments/:id", get(payments::get_payment))
        .route("/api/processors", get(processors::list_processors))
        .route("/api/processors/:id/toggle", post(processors::toggle_processor))
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/health-check", post(health_check::run_health_check))
        .route("/api/metrics", get(metrics::get_metrics))
        .route("/api/priorities", get(priorities::get_priorities))
        .route("/api/logs", get(logs::list_logs))
        .route("/ws", get(ws::push_channel))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
