use thiserror::Error;

/// Failures reported to the originating connection as an `error` event.
///
/// The `Display` text is what the client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Need 2 players to start")]
    InsufficientPlayers,

    #[error("Already searching for a match under this username")]
    AlreadySearching,

    #[error("Matchmaking timed out. Please try again.")]
    MatchmakingTimeout,

    /// Queue-internal; never sent to clients
    #[error("Connection is no longer active")]
    StaleConnection,
}
