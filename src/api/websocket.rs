use crate::hub::BroadcastHub;
use crate::ingress::UpdateIngress;
use crate::subscription::ConnectionManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state for the WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub hub: Arc<BroadcastHub>,
    pub ingress: Arc<UpdateIngress>,
}

/// GET /ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsAppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket connection
///
/// The session is registered with the hub for the lifetime of the socket and
/// unregistered on every exit path, so an abrupt disconnect never leaks a
/// session. The hub's stale-session pruning during publish covers the
/// remaining case of a task dying without reaching the unregister.
async fn handle_socket(socket: WebSocket, state: Arc<WsAppState>) {
    let (session_id, updates) = state.hub.register();

    let manager = ConnectionManager::new(session_id, Arc::clone(&state.ingress));
    manager.handle(socket, updates).await;

    state.hub.unregister(session_id);
}
