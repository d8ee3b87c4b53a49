use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::warn;

use super::state::AppState;

pub async fn push_channel(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut receiver = state.push.subscribe();

    loop {
        match receiver.recv().await {
            Ok(message) => {
                let payload = match serde_json::to_string(&message) {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                // Best-effort delivery: skip ahead to the newest message.
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    warn!("push subscriber disconnected");
}
