use tokio::sync::oneshot;

use crate::connection::ConnectionId;
use crate::room::RoomInfo;
use crate::websockets::ClientEvent;

/// Everything the orchestrator loop reacts to.
///
/// Timer-driven variants carry the room code, never a room reference; the
/// loop looks the room up again and re-validates its phase before acting.
#[derive(Debug)]
pub enum SessionCommand {
    /// A transport connection opened
    Connected { connection_id: ConnectionId },

    /// A parsed inbound event from a connection
    Client {
        connection_id: ConnectionId,
        event: ClientEvent,
    },

    /// A transport connection closed
    Disconnected { connection_id: ConnectionId },

    /// The start delay after `gameStarting` elapsed
    BeginClock { room_code: String },

    /// One period of the room's game clock elapsed
    ClockTick { room_code: String, clock_id: u64 },

    /// The grace window after a match ended elapsed
    RemoveFinished { room_code: String },

    /// Snapshot of active rooms for the HTTP API
    ListRooms {
        reply: oneshot::Sender<Vec<RoomInfo>>,
    },
}
