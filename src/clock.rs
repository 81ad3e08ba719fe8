//! Per-room match countdown.
//!
//! The clock does not touch room state itself. Its background task only
//! signals that a period elapsed; the owner applies the tick through
//! [`GameClock::tick`] after re-validating the room. Dropping the clock
//! aborts the task, so a room that leaves `playing` early never sees
//! another tick from it.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug)]
pub struct GameClock {
    id: u64,
    remaining: u32,
    task: JoinHandle<()>,
}

impl GameClock {
    /// Starts a countdown of `seconds` ticks, one per `period`.
    ///
    /// `on_tick` runs on the clock task once per period and returns `false`
    /// to stop early (e.g. the receiving side is gone).
    pub fn start<F>(id: u64, seconds: u32, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for _ in 0..seconds {
                ticker.tick().await;
                if !on_tick() {
                    debug!(clock_id = id, "Clock receiver gone, stopping");
                    break;
                }
            }
        });

        Self {
            id,
            remaining: seconds,
            task,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Applies one elapsed second and returns the time left
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

}

impl Drop for GameClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
