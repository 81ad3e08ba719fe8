use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::room::{MatchOutcome, RoomInfo};

/// Message types for WebSocket communication
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MessageType {
    // Client -> Server
    Authenticate,
    CreateRoom,
    JoinRoom,
    RejoinRoom,
    FindMatch,
    CancelMatchmaking,
    StartGame,
    UpdateScore,
    GameFinished,
    LeaveRoom,

    // Server -> Client
    Authenticated,
    RoomCreated,
    PlayerJoined,
    PlayerLeft,
    RejoinedRoom,
    Searching,
    MatchFound,
    MatchmakingTimeout,
    MatchmakingCancelled,
    GameStarting,
    GameStarted,
    TimerUpdate,
    ScoresUpdate,
    GameOver,
    OpponentDisconnected,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernamePayload {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembershipPayload {
    pub room_code: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCodePayload {
    pub room_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScorePayload {
    pub room_code: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinishedPayload {
    pub room_code: String,
    pub final_score: u32,
}

/// A parsed inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Authenticate { username: String },
    CreateRoom { username: String },
    JoinRoom { room_code: String, username: String },
    RejoinRoom { room_code: String, username: String },
    FindMatch { username: String },
    CancelMatchmaking,
    StartGame { room_code: String },
    UpdateScore { room_code: String, score: u32 },
    GameFinished { room_code: String, final_score: u32 },
    LeaveRoom { room_code: String },
}

#[derive(Debug, Error)]
pub enum MessageParseError {
    #[error("Invalid message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected message type: {0}")]
    UnexpectedType(MessageType),
}

fn payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, MessageParseError> {
    Ok(serde_json::from_value(value)?)
}

impl ClientEvent {
    /// Parses a raw text frame into a client event
    pub fn parse(text: &str) -> Result<Self, MessageParseError> {
        let message: WebSocketMessage = serde_json::from_str(text)?;
        Self::try_from(message)
    }
}

impl TryFrom<WebSocketMessage> for ClientEvent {
    type Error = MessageParseError;

    fn try_from(message: WebSocketMessage) -> Result<Self, Self::Error> {
        let body = message.payload;
        let event = match message.message_type {
            MessageType::Authenticate => {
                let p: UsernamePayload = payload(body)?;
                ClientEvent::Authenticate {
                    username: p.username,
                }
            }
            MessageType::CreateRoom => {
                let p: UsernamePayload = payload(body)?;
                ClientEvent::CreateRoom {
                    username: p.username,
                }
            }
            MessageType::JoinRoom => {
                let p: RoomMembershipPayload = payload(body)?;
                ClientEvent::JoinRoom {
                    room_code: p.room_code,
                    username: p.username,
                }
            }
            MessageType::RejoinRoom => {
                let p: RoomMembershipPayload = payload(body)?;
                ClientEvent::RejoinRoom {
                    room_code: p.room_code,
                    username: p.username,
                }
            }
            MessageType::FindMatch => {
                let p: UsernamePayload = payload(body)?;
                ClientEvent::FindMatch {
                    username: p.username,
                }
            }
            MessageType::CancelMatchmaking => ClientEvent::CancelMatchmaking,
            MessageType::StartGame => {
                let p: RoomCodePayload = payload(body)?;
                ClientEvent::StartGame {
                    room_code: p.room_code,
                }
            }
            MessageType::UpdateScore => {
                let p: UpdateScorePayload = payload(body)?;
                ClientEvent::UpdateScore {
                    room_code: p.room_code,
                    score: p.score,
                }
            }
            MessageType::GameFinished => {
                let p: GameFinishedPayload = payload(body)?;
                ClientEvent::GameFinished {
                    room_code: p.room_code,
                    final_score: p.final_score,
                }
            }
            MessageType::LeaveRoom => {
                let p: RoomCodePayload = payload(body)?;
                ClientEvent::LeaveRoom {
                    room_code: p.room_code,
                }
            }
            other => return Err(MessageParseError::UnexpectedType(other)),
        };
        Ok(event)
    }
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: RoomInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchingPayload {
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartingPayload {
    pub countdown: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartedPayload {
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdatePayload {
    pub time_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresUpdatePayload {
    pub scores: HashMap<String, u32>,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    fn with_payload<T: Serialize>(message_type: MessageType, payload: T) -> Self {
        Self::new(
            message_type,
            serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        )
    }

    /// Serializes for the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Create an AUTHENTICATED message
    pub fn authenticated(username: &str) -> Self {
        Self::with_payload(
            MessageType::Authenticated,
            UsernamePayload {
                username: username.to_string(),
            },
        )
    }

    /// Membership sync: roomCreated, playerJoined, playerLeft, rejoinedRoom, matchFound
    pub fn room(message_type: MessageType, room: RoomInfo, username: Option<&str>) -> Self {
        Self::with_payload(
            message_type,
            RoomPayload {
                room,
                username: username.map(str::to_string),
            },
        )
    }

    pub fn searching(position: usize) -> Self {
        Self::with_payload(MessageType::Searching, SearchingPayload { position })
    }

    pub fn matchmaking_timeout(message: String) -> Self {
        Self::with_payload(MessageType::MatchmakingTimeout, ErrorPayload { message })
    }

    pub fn matchmaking_cancelled() -> Self {
        Self::new(MessageType::MatchmakingCancelled, serde_json::json!({}))
    }

    pub fn game_starting(countdown: u32) -> Self {
        Self::with_payload(MessageType::GameStarting, GameStartingPayload { countdown })
    }

    pub fn game_started(duration: u32) -> Self {
        Self::with_payload(MessageType::GameStarted, GameStartedPayload { duration })
    }

    pub fn timer_update(time_left: u32) -> Self {
        Self::with_payload(MessageType::TimerUpdate, TimerUpdatePayload { time_left })
    }

    pub fn scores_update(scores: HashMap<String, u32>) -> Self {
        Self::with_payload(MessageType::ScoresUpdate, ScoresUpdatePayload { scores })
    }

    /// gameOver or opponentDisconnected, carrying results, winner and isDraw
    pub fn outcome(message_type: MessageType, outcome: &MatchOutcome) -> Self {
        Self::with_payload(message_type, outcome)
    }

    /// Create an ERROR message
    pub fn error(message: String) -> Self {
        Self::with_payload(MessageType::Error, ErrorPayload { message })
    }
}
