use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::SessionHandle;
use crate::shared::AppState;

use super::connection_manager::ConnectionManager;
use super::messages::{ClientEvent, WebSocketMessage};
use super::socket::{Connection, MessageHandler};

/// Message handler for receiving WebSocket messages from the client.
/// Parses frames into client events and forwards them to the session loop.
pub struct WebsocketReceiveHandler {
    session: SessionHandle,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl WebsocketReceiveHandler {
    pub fn new(session: SessionHandle, connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            session,
            connection_manager,
        }
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, connection_id: &str, message: String) {
        debug!(
            connection_id = %connection_id,
            message = %message,
            "Received message"
        );

        match ClientEvent::parse(&message) {
            Ok(event) => self.session.dispatch(connection_id, event),
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                // Malformed frames are answered to the sender only
                match WebSocketMessage::error(e.to_string()).to_json() {
                    Ok(reply) => {
                        self.connection_manager
                            .send_to_connection(connection_id, &reply)
                            .await
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize error reply"),
                }
            }
        }
    }
}

/// WebSocket endpoint. Identity arrives later through client events, so the
/// upgrade itself is unauthenticated.
/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    debug!("WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_websocket_connection(Box::new(socket), app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: Box<dyn super::socket::SocketWrapper>,
    app_state: AppState,
) {
    let connection_id = Uuid::new_v4().to_string();
    info!(connection_id = %connection_id, "WebSocket connection established");

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .connection_manager
        .add_connection(connection_id.clone(), outbound_sender)
        .await;
    app_state.session.connected(&connection_id);

    let message_handler = Arc::new(WebsocketReceiveHandler::new(
        app_state.session.clone(),
        app_state.connection_manager.clone(),
    ));
    let connection = Connection::new(
        connection_id.clone(),
        socket,
        outbound_receiver,
        message_handler,
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(summary) => {
            info!(
                connection_id = %connection_id,
                frames_in = summary.frames_in,
                frames_out = summary.frames_out,
                frames_dropped = summary.frames_dropped,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup: stop outbound delivery, then let the session loop run the leave flow
    app_state
        .connection_manager
        .remove_connection(&connection_id)
        .await;
    app_state.session.disconnected(&connection_id);

    info!(connection_id = %connection_id, "WebSocket disconnect handled");
}
