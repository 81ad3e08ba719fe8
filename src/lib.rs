// Library crate for the typing duel session server
// This file exposes the public API for integration tests

pub mod clock;
pub mod config;
pub mod connection;
pub mod matchmaking;
pub mod room;
pub mod session;
pub mod shared;
pub mod stats;
pub mod websockets;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use config::{ServerConfig, SessionConfig};
pub use room::{MatchOutcome, RoomInfo, RoomPhase};
pub use session::{SessionCommand, SessionError, SessionHandle, SessionOrchestrator};
pub use shared::{AppError, AppState};
pub use stats::{InMemoryUserStore, JsonFileUserStore, StatsAggregator, UserStore};
pub use websockets::{
    ClientEvent, ConnectionManager, InMemoryConnectionManager, MessageHandler, MessageType,
    WebSocketMessage, WebsocketReceiveHandler,
};

/// HTTP and WebSocket routes over the given state
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(shared::health))
        .route("/ws", get(websockets::websocket_handler))
        .route("/rooms", get(room::list_rooms))
        .route("/leaderboard", get(stats::leaderboard))
        .route("/users/:username/stats", get(stats::user_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
