//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use typing_duel::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    connections: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for specific connections
    pub fn for_connections(setup: &'a TestSetup, connections: Vec<&'a str>) -> Self {
        Self { setup, connections }
    }

    /// Create an assertion for a single connection
    pub fn for_connection(setup: &'a TestSetup, connection: &'a str) -> Self {
        Self::for_connections(setup, vec![connection])
    }

    /// Assert that every connection's next message has the given type
    /// (consumes it). All payloads must match.
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for connection in &self.connections {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(connection)
                .await;
            assert!(
                message.is_some(),
                "{} should have received a {} message",
                connection,
                expected_type
            );

            let msg: WebSocketMessage = serde_json::from_str(&message.unwrap()).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                connection
            );
            messages.push(msg);
        }

        if messages.len() > 1 {
            let first_payload = &messages[0].payload;
            for (i, msg) in messages.iter().enumerate().skip(1) {
                assert_eq!(
                    &msg.payload, first_payload,
                    "Connection {} payload differs from connection {}",
                    self.connections[i], self.connections[0]
                );
            }
        }

        MessageContent {
            payload: messages[0].payload.clone(),
        }
    }

    /// Assert that the connections have no unconsumed messages
    pub async fn received_no_messages(self) {
        for connection in &self.connections {
            let messages = self
                .setup
                .mock_conn_manager
                .get_messages_for(connection)
                .await;
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                connection,
                messages
            );
        }
    }

    /// Count unconsumed messages of a type for one connection (non-consuming)
    pub async fn count_message_type(&self, connection: &str, msg_type: MessageType) -> usize {
        let messages = self
            .setup
            .mock_conn_manager
            .get_messages_for(connection)
            .await;
        messages
            .iter()
            .filter_map(|msg_str| serde_json::from_str::<WebSocketMessage>(msg_str).ok())
            .filter(|msg| msg.message_type == msg_type)
            .count()
    }

    /// Assert that each connection's unconsumed messages start with this
    /// sequence of types (non-consuming)
    pub async fn received_message_sequence(self, expected_types: Vec<MessageType>) {
        for connection in &self.connections {
            let messages = self
                .setup
                .mock_conn_manager
                .get_messages_for(connection)
                .await;
            assert!(
                messages.len() >= expected_types.len(),
                "{} should have received {} messages, but only got {}",
                connection,
                expected_types.len(),
                messages.len()
            );

            for (i, expected_type) in expected_types.iter().enumerate() {
                let msg: WebSocketMessage = serde_json::from_str(&messages[i])
                    .unwrap_or_else(|e| {
                        panic!("Failed to parse message {} for {}: {}", i, connection, e)
                    });

                assert_eq!(
                    msg.message_type, *expected_type,
                    "{} message {} has wrong type: expected {:?}, got {:?}",
                    connection, i, expected_type, msg.message_type
                );
            }
        }
    }
}

// ============================================================================
// Message Content Assertions
// ============================================================================

pub struct MessageContent {
    payload: serde_json::Value,
}

impl MessageContent {
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Assert the room snapshot has this code
    pub fn with_room_code(self, expected: &str) -> Self {
        assert_eq!(self.payload["room"]["roomCode"], expected);
        self
    }

    /// Assert the room snapshot lists exactly these players, in order
    pub fn with_players(self, expected: Vec<&str>) -> Self {
        let players: Vec<String> =
            serde_json::from_value(self.payload["room"]["players"].clone()).unwrap();
        assert_eq!(players, expected);
        self
    }

    pub fn with_host(self, expected: &str) -> Self {
        assert_eq!(self.payload["room"]["host"], expected);
        self
    }

    pub fn with_username(self, expected: &str) -> Self {
        assert_eq!(self.payload["username"], expected);
        self
    }

    pub fn with_error(self, expected: &str) -> Self {
        assert_eq!(self.payload["message"], expected);
        self
    }

    pub fn with_position(self, expected: u64) -> Self {
        assert_eq!(self.payload["position"], expected);
        self
    }

    pub fn with_time_left(self, expected: u64) -> Self {
        assert_eq!(self.payload["timeLeft"], expected);
        self
    }

    pub fn with_winner(self, expected: &str) -> Self {
        assert_eq!(self.payload["winner"], expected);
        assert_eq!(self.payload["isDraw"], false);
        self
    }

    pub fn as_draw(self) -> Self {
        assert!(self.payload["winner"].is_null());
        assert_eq!(self.payload["isDraw"], true);
        self
    }

    /// Assert the result line at `index` has this player and score
    pub fn with_result(self, index: usize, username: &str, score: u64) -> Self {
        let result = &self.payload["results"][index];
        assert_eq!(result["username"], username);
        assert_eq!(result["score"], score);
        self
    }
}
