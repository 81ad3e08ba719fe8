// Public API - what other modules can use
pub use handlers::list_rooms;
pub use models::{PlayerInRoom, RoomInfo, RoomPhase, RoomSession};
pub use registry::{generate_room_code, RoomRegistry};
pub use results::{MatchOutcome, PlayerResult, Standing};

// Internal modules
mod handlers;
mod models;
mod registry;
mod results;
