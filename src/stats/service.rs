use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::room::MatchOutcome;

use super::{
    models::{LeaderboardEntry, MatchRecord, UserStats},
    repository::UserStore,
    StatsError,
};

/// Turns finished matches into per-user stat updates and match log entries
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn UserStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Applies one match outcome to every listed user: read all users,
    /// update, write all users back. Unknown users are skipped.
    #[instrument(skip(self, outcome), fields(winner = ?outcome.winner, is_draw = outcome.is_draw))]
    pub async fn apply(&self, outcome: &MatchOutcome) -> Result<usize, StatsError> {
        let mut users = self.store.read_users().await?;
        let mut updated = 0;

        for (result, standing) in outcome.standings() {
            match users.get_mut(&result.username) {
                Some(user) => {
                    user.stats.record(result.score, standing);
                    updated += 1;
                }
                None => {
                    warn!(username = %result.username, "No user record for match result, skipping");
                }
            }
        }

        if updated > 0 {
            self.store.write_users(&users).await?;
        }

        info!(updated = updated, "Applied match outcome to user stats");
        Ok(updated)
    }

    #[instrument(skip(self, record), fields(match_id = %record.match_id, room_code = %record.room_code))]
    pub async fn record_match(&self, record: &MatchRecord) -> Result<(), StatsError> {
        self.store.append_match(record).await
    }

    pub async fn user_stats(&self, username: &str) -> Result<Option<UserStats>, StatsError> {
        let users = self.store.read_users().await?;
        Ok(users.get(username).map(|user| user.stats.clone()))
    }

    /// Users ordered by win rate, then wins, then total score
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let users = self.store.read_users().await?;
        let mut entries: Vec<LeaderboardEntry> = users
            .into_iter()
            .map(|(username, user)| LeaderboardEntry {
                username,
                stats: user.stats,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.stats
                .win_rate
                .total_cmp(&a.stats.win_rate)
                .then_with(|| b.stats.wins.cmp(&a.stats.wins))
                .then_with(|| b.stats.total_score.cmp(&a.stats.total_score))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}
