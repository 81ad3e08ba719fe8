use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::session::SessionHandle;
use crate::stats::{StatsAggregator, StatsError};
use crate::websockets::ConnectionManager;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub stats: StatsAggregator,
    pub connection_manager: Arc<dyn ConnectionManager>,
}

impl AppState {
    pub fn new(
        session: SessionHandle,
        stats: StatsAggregator,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            session,
            stats,
            connection_manager,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::StorageError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// GET /health
/// Liveness plus the number of open sockets
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connections = state.connection_manager.connection_count().await;
    Json(json!({ "status": "ok", "connections": connections }))
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::config::SessionConfig;
    use crate::stats::{InMemoryUserStore, UserStore};
    use crate::websockets::InMemoryConnectionManager;

    /// Builder for creating AppState with overrides for testing.
    /// Unset parts get in-memory implementations and a freshly spawned
    /// session loop, so `build` must run inside a tokio runtime.
    pub struct AppStateBuilder {
        user_store: Option<Arc<dyn UserStore>>,
        connection_manager: Option<Arc<dyn ConnectionManager>>,
        session_config: SessionConfig,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_store: None,
                connection_manager: None,
                session_config: SessionConfig::default(),
            }
        }

        pub fn with_user_store(mut self, store: Arc<dyn UserStore>) -> Self {
            self.user_store = Some(store);
            self
        }

        pub fn with_connection_manager(mut self, manager: Arc<dyn ConnectionManager>) -> Self {
            self.connection_manager = Some(manager);
            self
        }

        pub fn build(self) -> AppState {
            let stats = StatsAggregator::new(
                self.user_store
                    .unwrap_or_else(|| Arc::new(InMemoryUserStore::new())),
            );
            let connection_manager = self
                .connection_manager
                .unwrap_or_else(|| Arc::new(InMemoryConnectionManager::new()));
            let session = SessionHandle::spawn(
                self.session_config,
                connection_manager.clone(),
                stats.clone(),
            );

            AppState::new(session, stats, connection_manager)
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
