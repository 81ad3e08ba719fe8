use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::connection::ConnectionId;

/// A player waiting to be paired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingEntry {
    pub connection_id: ConnectionId,
    pub username: String,
    pub enqueued_at: Instant,
}

impl MatchmakingEntry {
    pub fn new(connection_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            username: username.into(),
            enqueued_at: Instant::now(),
        }
    }
}

/// Why an entry left the queue without being matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The owning connection is gone
    StaleConnection,
    /// The entry waited longer than the matchmaking timeout
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub entry: MatchmakingEntry,
    pub reason: EvictionReason,
}

/// Result of `dequeue_next`: the surviving head (if any) and everything
/// evicted on the way to it
#[derive(Debug, Default)]
pub struct DequeueOutcome {
    pub entry: Option<MatchmakingEntry>,
    pub evicted: Vec<Eviction>,
}

impl DequeueOutcome {
    /// Evicted entries whose owners should be told their search timed out
    pub fn timed_out(&self) -> impl Iterator<Item = &MatchmakingEntry> {
        self.evicted
            .iter()
            .filter(|eviction| eviction.reason == EvictionReason::Timeout)
            .map(|eviction| &eviction.entry)
    }
}

/// FIFO waiting list for random pairing
#[derive(Debug)]
pub struct MatchmakingQueue {
    entries: VecDeque<MatchmakingEntry>,
    timeout: Duration,
}

impl MatchmakingQueue {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            timeout,
        }
    }

    /// Appends the entry and returns its 1-based position
    pub fn enqueue(&mut self, entry: MatchmakingEntry) -> usize {
        debug!(
            connection_id = %entry.connection_id,
            username = %entry.username,
            "Enqueuing matchmaking entry"
        );
        self.entries.push_back(entry);
        self.entries.len()
    }

    /// 1-based position of the connection's entry, if queued
    pub fn position_of(&self, connection_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.connection_id == connection_id)
            .map(|index| index + 1)
    }

    /// Pops entries from the head until one is both live and within the
    /// timeout. Dead and expired entries encountered on the way are evicted.
    pub fn dequeue_next<F>(&mut self, is_live: F) -> DequeueOutcome
    where
        F: Fn(&str) -> bool,
    {
        let now = Instant::now();
        let mut outcome = DequeueOutcome::default();

        while let Some(entry) = self.entries.pop_front() {
            let reason = if !is_live(&entry.connection_id) {
                Some(EvictionReason::StaleConnection)
            } else if now.duration_since(entry.enqueued_at) > self.timeout {
                Some(EvictionReason::Timeout)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    info!(
                        connection_id = %entry.connection_id,
                        username = %entry.username,
                        reason = ?reason,
                        "Evicting matchmaking entry"
                    );
                    outcome.evicted.push(Eviction { entry, reason });
                }
                None => {
                    outcome.entry = Some(entry);
                    break;
                }
            }
        }

        outcome
    }

    /// Puts a dequeued entry back at the head, keeping its original wait time
    pub fn requeue_front(&mut self, entry: MatchmakingEntry) {
        self.entries.push_front(entry);
    }

    /// Removes the connection's entry. Returns whether one was queued.
    pub fn remove(&mut self, connection_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.connection_id != connection_id);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
