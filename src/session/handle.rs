use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::{SessionCommand, SessionOrchestrator};
use crate::config::SessionConfig;
use crate::room::RoomInfo;
use crate::stats::StatsAggregator;
use crate::websockets::{ClientEvent, ConnectionManager};

/// Cloneable front door to the session loop, held by socket tasks and HTTP
/// handlers
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { commands }
    }

    /// Spawns the orchestrator loop and returns a handle to it
    pub fn spawn(
        config: SessionConfig,
        outbound: Arc<dyn ConnectionManager>,
        stats: StatsAggregator,
    ) -> Self {
        let (orchestrator, inbox) = SessionOrchestrator::with_channel(config, outbound, stats);
        let handle = Self::new(orchestrator.command_sender());

        tokio::spawn(orchestrator.run(inbox));
        info!("Session orchestrator spawned");
        handle
    }

    pub fn connected(&self, connection_id: &str) {
        self.submit(SessionCommand::Connected {
            connection_id: connection_id.to_string(),
        });
    }

    pub fn dispatch(&self, connection_id: &str, event: ClientEvent) {
        self.submit(SessionCommand::Client {
            connection_id: connection_id.to_string(),
            event,
        });
    }

    pub fn disconnected(&self, connection_id: &str) {
        self.submit(SessionCommand::Disconnected {
            connection_id: connection_id.to_string(),
        });
    }

    /// Snapshot of active rooms. Empty if the loop is gone.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let (reply, rx) = oneshot::channel();
        self.submit(SessionCommand::ListRooms { reply });
        rx.await.unwrap_or_default()
    }

    fn submit(&self, command: SessionCommand) {
        if let Err(e) = self.commands.send(command) {
            warn!(command = ?e.0, "Session loop is not running, command dropped");
        }
    }
}
