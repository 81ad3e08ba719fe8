use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::models::RoomInfo;
use crate::shared::AppState;

/// HTTP handler for listing active rooms
///
/// GET /rooms
/// Returns code, host, players and phase of every room the session loop holds
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomInfo>> {
    let rooms = state.session.list_rooms().await;

    info!(room_count = rooms.len(), "Rooms listed successfully");

    Json(rooms)
}
