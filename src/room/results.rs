use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One player's line in a finished match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub username: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disconnected: bool,
}

/// How a match ended for one player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Win,
    Loss,
    Draw,
}

/// Results ordered by descending score, winner first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub results: Vec<PlayerResult>,
    pub winner: Option<String>,
    pub is_draw: bool,
}

impl MatchOutcome {
    /// Ranks players by score. A tie for first among two or more players is
    /// a draw; equal scores keep join order.
    pub fn from_scores(players: &[String], scores: &HashMap<String, u32>) -> Self {
        let mut results: Vec<PlayerResult> = players
            .iter()
            .map(|username| PlayerResult {
                username: username.clone(),
                score: scores.get(username).copied().unwrap_or_default(),
                disconnected: false,
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));

        let is_draw = results.len() >= 2 && results[0].score == results[1].score;
        let winner = if is_draw {
            None
        } else {
            results.first().map(|r| r.username.clone())
        };

        Self {
            results,
            winner,
            is_draw,
        }
    }

    /// Mid-match disconnect: the remaining player wins on their current
    /// score, the departed player loses with 0
    pub fn forfeit(remaining: &str, remaining_score: u32, departed: &str) -> Self {
        Self {
            results: vec![
                PlayerResult {
                    username: remaining.to_string(),
                    score: remaining_score,
                    disconnected: false,
                },
                PlayerResult {
                    username: departed.to_string(),
                    score: 0,
                    disconnected: true,
                },
            ],
            winner: Some(remaining.to_string()),
            is_draw: false,
        }
    }

    /// Standing of the player at `index` in `results`
    pub fn standing_at(&self, index: usize) -> Standing {
        if self.is_draw {
            Standing::Draw
        } else if index == 0 {
            Standing::Win
        } else {
            Standing::Loss
        }
    }

    /// Results paired with each player's standing
    pub fn standings(&self) -> impl Iterator<Item = (&PlayerResult, Standing)> {
        self.results
            .iter()
            .enumerate()
            .map(|(index, result)| (result, self.standing_at(index)))
    }
}
