use std::collections::HashMap;
use tracing::debug;

/// Opaque id assigned by the transport layer to each live connection
pub type ConnectionId = String;

/// What the server knows about one live connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionEntry {
    pub username: Option<String>,
    pub room_code: Option<String>,
}

/// Maps live connections to player identity and current room
///
/// Usernames are not unique across connections: during a page transition the
/// same player is briefly attached to both the old and the new connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly opened connection with no identity yet
    pub fn register(&mut self, connection_id: &str) {
        debug!(connection_id = %connection_id, "Registering connection");
        self.entries.entry(connection_id.to_string()).or_default();
    }

    /// Attaches a player identity to the connection
    pub fn bind(&mut self, connection_id: &str, username: &str) {
        debug!(connection_id = %connection_id, username = %username, "Binding identity");
        self.entries
            .entry(connection_id.to_string())
            .or_default()
            .username = Some(username.to_string());
    }

    pub fn lookup(&self, connection_id: &str) -> Option<&str> {
        self.entries
            .get(connection_id)
            .and_then(|entry| entry.username.as_deref())
    }

    pub fn room_of(&self, connection_id: &str) -> Option<&str> {
        self.entries
            .get(connection_id)
            .and_then(|entry| entry.room_code.as_deref())
    }

    /// Sets or clears the connection's current room. Unknown connections are ignored.
    pub fn set_room(&mut self, connection_id: &str, room_code: Option<&str>) {
        if let Some(entry) = self.entries.get_mut(connection_id) {
            entry.room_code = room_code.map(str::to_string);
        }
    }

    /// Clears the room of every connection still pointing at `room_code`
    pub fn clear_room(&mut self, room_code: &str) {
        for entry in self.entries.values_mut() {
            if entry.room_code.as_deref() == Some(room_code) {
                entry.room_code = None;
            }
        }
    }

    pub fn unbind(&mut self, connection_id: &str) -> Option<ConnectionEntry> {
        debug!(connection_id = %connection_id, "Unbinding connection");
        self.entries.remove(connection_id)
    }

    pub fn is_live(&self, connection_id: &str) -> bool {
        self.entries.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
