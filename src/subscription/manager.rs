use crate::hub::SessionId;
use crate::ingress::{PersistMode, UpdateIngress};
use crate::subscription::protocol::{BusLocationMessage, ClientMessage};
use crate::update::VehicleUpdate;
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Drives a single streaming session over a WebSocket.
///
/// The same connection can both push driver updates and receive the
/// broadcast stream; vehicles typically only send, observers only receive.
pub struct ConnectionManager {
    session_id: SessionId,
    ingress: Arc<UpdateIngress>,
}

impl ConnectionManager {
    pub fn new(session_id: SessionId, ingress: Arc<UpdateIngress>) -> Self {
        Self {
            session_id,
            ingress,
        }
    }

    /// Handle the connection lifecycle. Returns when the client disconnects,
    /// the transport fails, or the session's update stream is terminated.
    pub async fn handle(
        self,
        mut socket: WebSocket,
        mut updates: mpsc::Receiver<VehicleUpdate>,
    ) {
        info!(session_id = %self.session_id, "WebSocket connection established");

        loop {
            tokio::select! {
                // Handle incoming client messages
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            // Fire-and-forget path: failures are logged, the
                            // client gets no acknowledgment either way
                            if let Err(e) = self.handle_client_message(&text) {
                                warn!(session_id = %self.session_id, error = %e, "Dropped client message");
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!(session_id = %self.session_id, "WebSocket client disconnected");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(session_id = %self.session_id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary, pong messages
                        }
                        Err(e) => {
                            warn!(session_id = %self.session_id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Handle broadcast updates queued for this session
                maybe_update = updates.recv() => {
                    match maybe_update {
                        Some(update) => {
                            if let Err(e) = Self::send_location(&mut socket, update).await {
                                error!(session_id = %self.session_id, error = %e, "Failed to send location update");
                                break;
                            }
                        }
                        // Sender dropped: the session was unregistered
                        None => break,
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!(session_id = %self.session_id, "WebSocket connection closed");
    }

    /// Parse and ingest a driver update (best-effort telemetry coupling).
    fn handle_client_message(&self, text: &str) -> anyhow::Result<()> {
        let msg: ClientMessage = serde_json::from_str(text)?;

        match msg {
            ClientMessage::DriverUpdate(raw) => {
                self.ingress.accept(raw, PersistMode::BestEffort)?;
            }
        }

        Ok(())
    }

    /// Send a position update to the client
    async fn send_location(socket: &mut WebSocket, update: VehicleUpdate) -> anyhow::Result<()> {
        let msg = BusLocationMessage::from(update);
        let json = serde_json::to_string(&msg)?;
        socket.send(Message::Text(json)).await?;
        Ok(())
    }
}
