// Public API - what other modules can use
pub use queue::{DequeueOutcome, Eviction, EvictionReason, MatchmakingEntry, MatchmakingQueue};

// Internal modules
mod queue;
