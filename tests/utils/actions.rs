#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Duration;

use typing_duel::{
    stats::{MatchRecord, UserStats, UserStore},
    websockets::{ConnectionManager, MessageHandler, MessageType, WebSocketMessage},
};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Waits until the session loop has processed everything queued so far.
    /// The loop is FIFO, so a round-trip query lands behind earlier commands.
    pub async fn settle(&self) {
        self.session.list_rooms().await;
    }

    /// Lets (paused) time run forward, then settles
    pub async fn advance(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
        self.settle().await;
    }

    /// Open a transport connection
    pub async fn connect(&self, connection_id: &str) {
        let (sender, _receiver) = mpsc::unbounded_channel();
        self.mock_conn_manager
            .add_connection(connection_id.to_string(), sender)
            .await;
        self.session.connected(connection_id);
        self.settle().await;
    }

    /// Close a transport connection the way the socket task does
    pub async fn disconnect(&self, connection_id: &str) {
        self.mock_conn_manager.remove_connection(connection_id).await;
        self.session.disconnected(connection_id);
        self.settle().await;
    }

    /// Send a WebSocket message and wait for processing
    pub async fn send_message(&self, connection_id: &str, message: WebSocketMessage) {
        let message_json = serde_json::to_string(&message).unwrap();
        self.send_raw(connection_id, &message_json).await;
    }

    /// Send an arbitrary text frame and wait for processing
    pub async fn send_raw(&self, connection_id: &str, frame: &str) {
        self.input_handler
            .handle_message(connection_id, frame.to_string())
            .await;
        self.settle().await;
    }

    /// Clear all recorded messages
    pub async fn clear_messages(&self) {
        self.mock_conn_manager.clear_messages().await;
    }

    pub async fn user_stats(&self, username: &str) -> UserStats {
        self.store.read_users().await.unwrap()[username].stats.clone()
    }

    pub async fn match_records(&self) -> Vec<MatchRecord> {
        self.store.read_matches().await.unwrap()
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Creates a room and returns its code, consuming the `roomCreated` reply
    pub async fn create_room(&self, connection_id: &str, username: &str) -> String {
        self.send_message(
            connection_id,
            WebSocketMessage::new(MessageType::CreateRoom, json!({ "username": username })),
        )
        .await;

        let reply = self
            .mock_conn_manager
            .consume_message_for(connection_id)
            .await
            .expect("roomCreated reply");
        let reply: WebSocketMessage = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply.message_type, MessageType::RoomCreated);
        reply.payload["room"]["roomCode"].as_str().unwrap().to_string()
    }

    pub async fn join_room(&self, connection_id: &str, room_code: &str, username: &str) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(
                MessageType::JoinRoom,
                json!({ "roomCode": room_code, "username": username }),
            ),
        )
        .await;
    }

    pub async fn rejoin_room(&self, connection_id: &str, room_code: &str, username: &str) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(
                MessageType::RejoinRoom,
                json!({ "roomCode": room_code, "username": username }),
            ),
        )
        .await;
    }

    pub async fn find_match(&self, connection_id: &str, username: &str) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(MessageType::FindMatch, json!({ "username": username })),
        )
        .await;
    }

    pub async fn start_game(&self, connection_id: &str, room_code: &str) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(MessageType::StartGame, json!({ "roomCode": room_code })),
        )
        .await;
    }

    pub async fn update_score(&self, connection_id: &str, room_code: &str, score: u32) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(
                MessageType::UpdateScore,
                json!({ "roomCode": room_code, "score": score }),
            ),
        )
        .await;
    }

    pub async fn leave_room(&self, connection_id: &str, room_code: &str) {
        self.send_message(
            connection_id,
            WebSocketMessage::new(MessageType::LeaveRoom, json!({ "roomCode": room_code })),
        )
        .await;
    }

    /// alice on `conn-a` hosts, bob on `conn-b` joins. Returns the room code
    /// with both message queues cleared.
    pub async fn two_player_room(&self) -> String {
        self.connect("conn-a").await;
        self.connect("conn-b").await;
        let code = self.create_room("conn-a", "alice").await;
        self.join_room("conn-b", &code, "bob").await;
        self.clear_messages().await;
        code
    }

    /// Starts a match in a fresh two-player room and runs past the start delay
    pub async fn playing_room(&self) -> String {
        let code = self.two_player_room().await;
        self.start_game("conn-a", &code).await;
        self.advance(self.config.clock_start_delay + Duration::from_millis(10))
            .await;
        self.clear_messages().await;
        code
    }
}
