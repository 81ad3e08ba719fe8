// Public API - what other modules can use
pub use errors::StatsError;
pub use handlers::{leaderboard, user_stats};
pub use models::{
    win_rate, LeaderboardEntry, MatchRecord, UserMap, UserRecord, UserStats,
};
pub use repository::{InMemoryUserStore, JsonFileUserStore, UserStore};
pub use service::StatsAggregator;

// Internal modules
mod errors;
mod handlers;
pub mod models;
pub mod repository;
mod service;
