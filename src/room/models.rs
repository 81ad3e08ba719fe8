use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};

use crate::clock::GameClock;
use crate::connection::ConnectionId;
use crate::session::SessionError;

/// Room state machine phase. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInRoom {
    pub username: String,
    pub connection_id: ConnectionId,
    pub ready: bool,
}

impl PlayerInRoom {
    fn new(username: &str, connection_id: &str) -> Self {
        Self {
            username: username.to_string(),
            connection_id: connection_id.to_string(),
            ready: false,
        }
    }
}

/// Client-facing summary of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_code: String,
    pub host: String,
    pub players: Vec<String>,
    pub phase: RoomPhase,
    pub capacity: usize,
}

/// One match's state: membership, scores, phase and clock
#[derive(Debug)]
pub struct RoomSession {
    code: String,
    host: String,
    players: Vec<PlayerInRoom>,
    capacity: usize,
    phase: RoomPhase,
    scores: HashMap<String, u32>,
    started_at: Option<DateTime<Utc>>,
    clock: Option<GameClock>,
}

impl RoomSession {
    /// Creates a waiting room with the host as its only player
    pub fn new(code: String, host: &str, host_connection: &str, capacity: usize) -> Self {
        let mut scores = HashMap::new();
        scores.insert(host.to_string(), 0);

        Self {
            code,
            host: host.to_string(),
            players: vec![PlayerInRoom::new(host, host_connection)],
            capacity,
            phase: RoomPhase::Waiting,
            scores,
            started_at: None,
            clock: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn players(&self) -> &[PlayerInRoom] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn usernames(&self) -> Vec<String> {
        self.players.iter().map(|p| p.username.clone()).collect()
    }

    pub fn connection_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.connection_id.clone()).collect()
    }

    pub fn scores(&self) -> &HashMap<String, u32> {
        &self.scores
    }

    pub fn score_of(&self, username: &str) -> Option<u32> {
        self.scores.get(username).copied()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_player(&self, username: &str) -> bool {
        self.players.iter().any(|p| p.username == username)
    }

    pub fn player_by_connection(&self, connection_id: &str) -> Option<&PlayerInRoom> {
        self.players.iter().find(|p| p.connection_id == connection_id)
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.code.clone(),
            host: self.host.clone(),
            players: self.usernames(),
            phase: self.phase,
            capacity: self.capacity,
        }
    }

    /// Adds a player to a waiting room, gated on phase and capacity
    pub fn add_player(&mut self, username: &str, connection_id: &str) -> Result<(), SessionError> {
        if self.phase != RoomPhase::Waiting {
            return Err(SessionError::GameAlreadyStarted);
        }
        if self.has_player(username) {
            self.rebind(username, connection_id);
            return Ok(());
        }
        if self.is_full() {
            return Err(SessionError::RoomFull);
        }

        self.players.push(PlayerInRoom::new(username, connection_id));
        self.scores.insert(username.to_string(), 0);
        Ok(())
    }

    /// Points an existing player record at a new connection.
    /// Returns false if the player is not in the room.
    pub fn rebind(&mut self, username: &str, connection_id: &str) -> bool {
        match self.players.iter_mut().find(|p| p.username == username) {
            Some(player) => {
                player.connection_id = connection_id.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes a player and their score. The host role passes to the first
    /// remaining player.
    pub fn remove_player(&mut self, username: &str) -> Option<PlayerInRoom> {
        let index = self.players.iter().position(|p| p.username == username)?;
        let removed = self.players.remove(index);
        self.scores.remove(username);

        if self.host == username {
            if let Some(next) = self.players.first() {
                self.host = next.username.clone();
            }
        }

        Some(removed)
    }

    pub fn mark_ready(&mut self, username: &str) -> bool {
        match self.players.iter_mut().find(|p| p.username == username) {
            Some(player) => {
                player.ready = true;
                true
            }
            None => false,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.players.iter().filter(|p| p.ready).count()
    }

    /// `waiting -> playing`: resets every score to 0 and stamps the start time
    pub fn begin_match(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.phase != RoomPhase::Waiting {
            return Err(SessionError::GameAlreadyStarted);
        }
        if !self.is_full() {
            return Err(SessionError::InsufficientPlayers);
        }

        self.scores = self
            .players
            .iter()
            .map(|p| (p.username.clone(), 0))
            .collect();
        self.started_at = Some(now);
        self.phase = RoomPhase::Playing;
        Ok(())
    }

    /// Overwrites a member's score. Returns false for non-members.
    pub fn set_score(&mut self, username: &str, score: u32) -> bool {
        match self.scores.get_mut(username) {
            Some(slot) => {
                *slot = score;
                true
            }
            None => false,
        }
    }

    /// `playing -> finished`. Cancels the clock. Returns false if the room was
    /// not playing, so callers can use it as an at-most-once guard.
    pub fn finish(&mut self) -> bool {
        if self.phase != RoomPhase::Playing {
            return false;
        }
        self.phase = RoomPhase::Finished;
        self.clock = None;
        true
    }

    pub fn clock(&self) -> Option<&GameClock> {
        self.clock.as_ref()
    }

    pub fn clock_mut(&mut self) -> Option<&mut GameClock> {
        self.clock.as_mut()
    }

    /// Installs the match clock. Replacing an existing clock aborts it.
    pub fn set_clock(&mut self, clock: GameClock) {
        self.clock = Some(clock);
    }
}
