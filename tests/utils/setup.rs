#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use std::time::Duration;

use typing_duel::{
    stats::{InMemoryUserStore, StatsAggregator, UserMap, UserRecord},
    SessionConfig, SessionHandle, WebsocketReceiveHandler,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub session: SessionHandle,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub input_handler: WebsocketReceiveHandler,
    pub store: Arc<InMemoryUserStore>,
    pub config: SessionConfig,
}

pub struct TestSetupBuilder {
    users: Vec<String>,
    config: SessionConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            config: SessionConfig {
                match_duration: Duration::from_secs(3),
                ..SessionConfig::default()
            },
        }
    }

    /// Seeds the user store with accounts for these usernames
    pub fn with_users(mut self, users: Vec<&str>) -> Self {
        self.users = users.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_users(self) -> Self {
        self.with_users(vec!["alice", "bob"])
    }

    pub fn with_match_seconds(mut self, seconds: u64) -> Self {
        self.config.match_duration = Duration::from_secs(seconds);
        self
    }

    pub fn with_matchmaking_timeout(mut self, timeout: Duration) -> Self {
        self.config.matchmaking_timeout = timeout;
        self
    }

    pub async fn build(self) -> TestSetup {
        let users: UserMap = self
            .users
            .iter()
            .map(|name| (name.clone(), UserRecord::default()))
            .collect();
        let store = Arc::new(InMemoryUserStore::with_users(users));
        let mock_conn_manager = Arc::new(MockConnectionManager::new());

        let session = SessionHandle::spawn(
            self.config.clone(),
            mock_conn_manager.clone(),
            StatsAggregator::new(store.clone()),
        );
        let input_handler =
            WebsocketReceiveHandler::new(session.clone(), mock_conn_manager.clone());

        TestSetup {
            session,
            mock_conn_manager,
            input_handler,
            store,
            config: self.config,
        }
    }
}
