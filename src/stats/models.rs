use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::room::{MatchOutcome, PlayerResult, Standing};

/// Per-user aggregate statistics. `win_rate` is stored, and recomputed on
/// every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_score: u64,
    pub high_score: u32,
    pub win_rate: f64,
}

impl UserStats {
    /// Folds one finished match into the aggregate
    pub fn record(&mut self, score: u32, standing: Standing) {
        self.games_played += 1;
        self.total_score += u64::from(score);
        match standing {
            Standing::Win => self.wins += 1,
            Standing::Loss => self.losses += 1,
            Standing::Draw => self.draws += 1,
        }
        if score > self.high_score {
            self.high_score = score;
        }
        self.win_rate = win_rate(self.wins, self.games_played, self.draws);
    }
}

/// wins / (games - draws) * 100, rounded to 2 decimals; 0 when no decisive games
pub fn win_rate(wins: u32, games_played: u32, draws: u32) -> f64 {
    let decisive = games_played.saturating_sub(draws);
    if decisive == 0 {
        return 0.0;
    }
    let rate = f64::from(wins) / f64::from(decisive) * 100.0;
    (rate * 100.0).round() / 100.0
}

/// A stored user. Fields owned by the account system (password hash,
/// creation time, ...) are carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub stats: UserStats,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The whole user collection, keyed by username
pub type UserMap = BTreeMap<String, UserRecord>;

/// Immutable log entry written once per finished match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: String,
    pub room_code: String,
    pub players: Vec<String>,
    pub results: Vec<PlayerResult>,
    pub is_draw: bool,
    pub winner: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
}

impl MatchRecord {
    pub fn new(
        room_code: &str,
        players: Vec<String>,
        outcome: &MatchOutcome,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id: Uuid::new_v4().to_string(),
            room_code: room_code.to_string(),
            players,
            results: outcome.results.clone(),
            is_draw: outcome.is_draw,
            winner: outcome.winner.clone(),
            started_at,
            ended_at,
            duration_secs: (ended_at - started_at).num_seconds().max(0),
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    #[serde(flatten)]
    pub stats: UserStats,
}
