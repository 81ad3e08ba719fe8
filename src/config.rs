use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Timing and capacity knobs for the match lifecycle
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Players per room; a room is startable only when full
    pub room_capacity: usize,
    /// Length of a match once the clock starts
    pub match_duration: Duration,
    /// Countdown announced to clients in `gameStarting`
    pub countdown_seconds: u32,
    /// Delay between entering `playing` and starting the clock
    pub clock_start_delay: Duration,
    /// Period of a game clock tick
    pub tick_interval: Duration,
    /// How long a finished room lingers before removal
    pub finished_grace: Duration,
    /// Maximum time an entry may wait in the matchmaking queue
    pub matchmaking_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_capacity: 2,
            match_duration: Duration::from_secs(60),
            countdown_seconds: 3,
            clock_start_delay: Duration::from_millis(4000),
            tick_interval: Duration::from_secs(1),
            finished_grace: Duration::from_millis(5000),
            matchmaking_timeout: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

impl SessionConfig {
    /// Match duration in whole seconds, as counted down by the game clock
    pub fn match_seconds(&self) -> u32 {
        u32::try_from(self.match_duration.as_secs()).unwrap_or(u32::MAX)
    }
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("data"),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds the configuration from `TYPING_DUEL_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "TYPING_DUEL_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("TYPING_DUEL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        // The clock counts down in u32 seconds, so larger values are rejected at parse
        if let Some(secs) = parse_var::<u32, _>(&lookup, "TYPING_DUEL_MATCH_SECONDS")? {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "TYPING_DUEL_MATCH_SECONDS",
                    value: secs.to_string(),
                });
            }
            config.session.match_duration = Duration::from_secs(u64::from(secs));
        }
        if let Some(ms) = parse_var(&lookup, "TYPING_DUEL_START_DELAY_MS")? {
            config.session.clock_start_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "TYPING_DUEL_FINISHED_GRACE_MS")? {
            config.session.finished_grace = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, "TYPING_DUEL_MATCHMAKING_TIMEOUT_SECS")? {
            config.session.matchmaking_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(None),
    }
}
