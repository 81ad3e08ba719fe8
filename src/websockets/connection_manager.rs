use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Outbound side of live connections: delivers serialized messages to sockets.
/// The session loop only ever addresses connections by id.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>);

    async fn remove_connection(&self, connection_id: &str);

    async fn send_to_connection(&self, connection_id: &str, message: &str);

    async fn send_to_connections(&self, connection_ids: &[String], message: &str);

    /// Number of sockets currently able to receive
    async fn connection_count(&self) -> usize;
}

type Outbox = mpsc::UnboundedSender<String>;

#[derive(Default)]
pub struct InMemoryConnectionManager {
    outboxes: Arc<RwLock<HashMap<String, Outbox>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers to every listed outbox and returns the ids whose socket task
    /// has already gone away
    async fn deliver(&self, connection_ids: &[String], message: &str) -> Vec<String> {
        let outboxes = self.outboxes.read().await;
        connection_ids
            .iter()
            .filter(|id| match outboxes.get(id.as_str()) {
                Some(outbox) => outbox.send(message.to_string()).is_err(),
                None => {
                    debug!(connection_id = %id, "No outbox for connection");
                    false
                }
            })
            .cloned()
            .collect()
    }

    async fn prune(&self, closed: Vec<String>) {
        if closed.is_empty() {
            return;
        }
        let mut outboxes = self.outboxes.write().await;
        for connection_id in closed {
            debug!(connection_id = %connection_id, "Pruning closed outbox");
            outboxes.remove(&connection_id);
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>) {
        self.outboxes.write().await.insert(connection_id, sender);
    }

    async fn remove_connection(&self, connection_id: &str) {
        self.outboxes.write().await.remove(connection_id);
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        let closed = self.deliver(&[connection_id.to_string()], message).await;
        self.prune(closed).await;
    }

    async fn send_to_connections(&self, connection_ids: &[String], message: &str) {
        let closed = self.deliver(connection_ids, message).await;
        self.prune(closed).await;
    }

    async fn connection_count(&self) -> usize {
        self.outboxes.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_only_target_connection() {
        let manager = InMemoryConnectionManager::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        manager.add_connection("a".to_string(), tx_a).await;
        manager.add_connection("b".to_string(), tx_b).await;

        manager.send_to_connection("a", "hello").await;

        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert!(rx_b.try_recv().is_err());
        assert_eq!(manager.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_removed_connection_receives_nothing() {
        let manager = InMemoryConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.add_connection("a".to_string(), tx).await;
        manager.remove_connection("a").await;

        manager
            .send_to_connections(&["a".to_string()], "late")
            .await;

        // Sender was dropped with the map entry, so the channel is closed and empty
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_prunes_outboxes_of_finished_sockets() {
        let manager = InMemoryConnectionManager::new();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let (tx_gone, rx_gone) = mpsc::unbounded_channel();
        manager.add_connection("live".to_string(), tx_live).await;
        manager.add_connection("gone".to_string(), tx_gone).await;
        drop(rx_gone);

        manager
            .send_to_connections(&["gone".to_string(), "live".to_string()], "tick")
            .await;

        assert_eq!(rx_live.try_recv().unwrap(), "tick");
        assert_eq!(manager.connection_count().await, 1);
    }
}
