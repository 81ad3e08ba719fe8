use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use super::models::{RoomInfo, RoomSession};

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random 6-character uppercase alphanumeric room code
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.random_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

/// All active rooms, keyed by room code
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomSession>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a code not used by any active room
    pub fn unique_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
            debug!(room_code = %code, "Room code collision, regenerating");
        }
    }

    /// Creates and registers a waiting room under a fresh code
    #[instrument(skip(self))]
    pub fn create(
        &mut self,
        host: &str,
        host_connection: &str,
        capacity: usize,
    ) -> &mut RoomSession {
        let code = self.unique_code();
        info!(room_code = %code, host = %host, "Creating room");
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| RoomSession::new(code, host, host_connection, capacity))
    }

    pub fn get(&self, code: &str) -> Option<&RoomSession> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut RoomSession> {
        self.rooms.get_mut(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    /// Drops the room; its clock (if any) is aborted with it
    pub fn remove(&mut self, code: &str) -> Option<RoomSession> {
        let removed = self.rooms.remove(code);
        match &removed {
            Some(_) => info!(room_code = %code, "Room removed"),
            None => warn!(room_code = %code, "Tried to remove unknown room"),
        }
        removed
    }

    pub fn list(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self.rooms.values().map(RoomSession::info).collect();
        rooms.sort_by(|a, b| a.room_code.cmp(&b.room_code));
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
