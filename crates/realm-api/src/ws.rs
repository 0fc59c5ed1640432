//! `WebSocket` push of committed province changes.
//!
//! Clients connect to `GET /ws/provinces/{id}` and receive a JSON-encoded
//! [`ProvinceChanged`] frame for the current snapshot, then one frame per
//! committed write to that province. Every frame carries a full snapshot
//! and its version, so a client that lags and skips frames only needs the
//! newest one.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use realm_core::{ProvinceStore, ProvinceSubscription};
use realm_types::{ProvinceChanged, ProvinceId};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::handlers::parse_province_id;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming changes to one province.
///
/// # Route
///
/// `GET /ws/provinces/{id}`
pub async fn ws_province<S: ProvinceStore>(
    ws: WebSocketUpgrade,
    Path(id_str): Path<String>,
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ApiError> {
    let province_id = parse_province_id(&id_str)?;
    // Subscribe before reading so nothing committed in between is lost.
    let subscription = state.store.subscribe(province_id);
    let current = state.store.get(province_id).await?;
    Ok(ws.on_upgrade(move |socket| {
        handle_ws(socket, province_id, ProvinceChanged::from_snapshot(current), subscription)
    }))
}

async fn send_change(socket: &mut WebSocket, change: &ProvinceChanged) -> bool {
    let json = match serde_json::to_string(change) {
        Ok(j) => j,
        Err(e) => {
            warn!(province_id = %change.province_id, "Failed to serialize province change: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: send the baseline snapshot, then
/// forward each change as a text frame until either side goes away.
async fn handle_ws(
    mut socket: WebSocket,
    province_id: ProvinceId,
    baseline: ProvinceChanged,
    mut subscription: ProvinceSubscription,
) {
    debug!(%province_id, "WebSocket client connected");

    if !send_change(&mut socket, &baseline).await {
        debug!(%province_id, "WebSocket client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            change = subscription.recv() => {
                let Some(change) = change else {
                    debug!(%province_id, "Change channel closed, shutting down WebSocket");
                    return;
                };
                if !send_change(&mut socket, &change).await {
                    debug!(%province_id, "WebSocket client disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%province_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%province_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%province_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Clients act through the REST endpoints.
                    }
                }
            }
        }
    }
}
