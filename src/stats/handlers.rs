use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::models::{LeaderboardEntry, UserStats};
use crate::shared::{AppError, AppState};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /leaderboard?limit=N
#[instrument(name = "leaderboard", skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT);
    if limit == 0 {
        return Err(AppError::BadRequest(
            "limit must be at least 1".to_string(),
        ));
    }
    let entries = state.stats.leaderboard(limit).await?;

    info!(entries = entries.len(), "Leaderboard served");
    Ok(Json(entries))
}

/// GET /users/:username/stats
#[instrument(name = "user_stats", skip(state))]
pub async fn user_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserStats>, AppError> {
    state
        .stats
        .user_stats(&username)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))
}
