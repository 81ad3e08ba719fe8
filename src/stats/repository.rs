use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use super::{
    models::{MatchRecord, UserMap},
    StatsError,
};

/// Persistence collaborator: whole-collection user reads/writes plus an
/// append-only match log
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn read_users(&self) -> Result<UserMap, StatsError>;
    async fn write_users(&self, users: &UserMap) -> Result<(), StatsError>;
    async fn append_match(&self, record: &MatchRecord) -> Result<(), StatsError>;
    async fn read_matches(&self) -> Result<Vec<MatchRecord>, StatsError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<UserMap>>,
    matches: Arc<RwLock<Vec<MatchRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with the given users
    pub fn with_users(users: UserMap) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
            matches: Arc::default(),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn read_users(&self) -> Result<UserMap, StatsError> {
        Ok(self.users.read().await.clone())
    }

    async fn write_users(&self, users: &UserMap) -> Result<(), StatsError> {
        *self.users.write().await = users.clone();
        Ok(())
    }

    async fn append_match(&self, record: &MatchRecord) -> Result<(), StatsError> {
        self.matches.write().await.push(record.clone());
        Ok(())
    }

    async fn read_matches(&self) -> Result<Vec<MatchRecord>, StatsError> {
        Ok(self.matches.read().await.clone())
    }
}

/// JSON file store: `users.json` holds an object keyed by username and
/// `matches.json` an array. Every change rewrites the whole file through a
/// temp file and rename.
#[derive(Debug)]
pub struct JsonFileUserStore {
    users_path: PathBuf,
    matches_path: PathBuf,
    // Serializes read-modify-write of the match log
    write_lock: Mutex<()>,
}

impl JsonFileUserStore {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StatsError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;

        Ok(Self {
            users_path: data_dir.join("users.json"),
            matches_path: data_dir.join("matches.json"),
            write_lock: Mutex::new(()),
        })
    }

    async fn read_json<T>(path: &Path) -> Result<T, StatsError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match tokio::fs::read(path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StatsError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        debug!(path = %path.display(), "Wrote store file");
        Ok(())
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
    #[instrument(skip(self))]
    async fn read_users(&self) -> Result<UserMap, StatsError> {
        Self::read_json(&self.users_path).await
    }

    #[instrument(skip(self, users))]
    async fn write_users(&self, users: &UserMap) -> Result<(), StatsError> {
        let _guard = self.write_lock.lock().await;
        Self::write_json(&self.users_path, users).await
    }

    #[instrument(skip(self, record), fields(match_id = %record.match_id))]
    async fn append_match(&self, record: &MatchRecord) -> Result<(), StatsError> {
        let _guard = self.write_lock.lock().await;
        let mut matches: Vec<MatchRecord> = Self::read_json(&self.matches_path).await?;
        matches.push(record.clone());
        Self::write_json(&self.matches_path, &matches).await
    }

    async fn read_matches(&self) -> Result<Vec<MatchRecord>, StatsError> {
        Self::read_json(&self.matches_path).await
    }
}
