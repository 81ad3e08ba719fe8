use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Text-only view of a client socket
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next text message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle an incoming text frame from the given connection
    async fn handle_message(&self, connection_id: &str, message: String);
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // Ignore binary/ping/pong
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Largest inbound text frame forwarded to the session. Client events are a
/// few short fields, so anything bigger is dropped.
pub const MAX_INBOUND_FRAME_BYTES: usize = 4 * 1024;

/// Frame counts for one connection, logged when it closes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub frames_in: usize,
    pub frames_out: usize,
    pub frames_dropped: usize,
}

/// One client socket bridged to the session: outbound frames come from the
/// connection manager's channel, inbound frames go to the message handler
pub struct Connection {
    pub connection_id: String,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        connection_id: String,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            connection_id,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Pumps frames both ways until the client closes or the outbox is dropped
    pub async fn run(mut self) -> Result<ConnectionSummary, SocketError> {
        let mut summary = ConnectionSummary::default();

        loop {
            tokio::select! {
                // Pending results and timer updates go out before the next read
                biased;

                msg = self.outbound_receiver.recv() => {
                    let Some(message) = msg else { break };
                    self.socket.send_message(message).await?;
                    summary.frames_out += 1;
                }

                msg = self.socket.receive_message() => {
                    let Some(message) = msg? else { break };
                    if message.len() > MAX_INBOUND_FRAME_BYTES {
                        warn!(
                            connection_id = %self.connection_id,
                            bytes = message.len(),
                            "Dropping oversized frame"
                        );
                        summary.frames_dropped += 1;
                        continue;
                    }
                    summary.frames_in += 1;
                    self.message_handler
                        .handle_message(&self.connection_id, message)
                        .await;
                }
            }
        }

        let _ = self.socket.close().await;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Scripted socket: yields the queued inbound frames, then reports close
    struct ScriptedSocket {
        inbound: VecDeque<String>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SocketWrapper for ScriptedSocket {
        async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
            self.sent.lock().await.push(message);
            Ok(())
        }

        async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
            match self.inbound.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), SocketError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle_message(&self, connection_id: &str, message: String) {
            self.seen
                .lock()
                .await
                .push((connection_id.to_string(), message));
        }
    }

    #[tokio::test]
    async fn test_connection_routes_both_directions() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let socket = ScriptedSocket {
            inbound: VecDeque::from(vec!["hello".to_string()]),
            sent: sent.clone(),
        };
        let handler = Arc::new(RecordingHandler::default());
        let (tx, rx) = mpsc::unbounded_channel();

        let connection = Connection::new("conn-1".to_string(), Box::new(socket), rx, handler.clone());
        let task = tokio::spawn(connection.run());

        tx.send("outbound".to_string()).unwrap();
        while sent.lock().await.is_empty() || handler.seen.lock().await.is_empty() {
            tokio::task::yield_now().await;
        }
        drop(tx);

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.frames_in, 1);
        assert_eq!(summary.frames_out, 1);
        assert_eq!(*sent.lock().await, vec!["outbound".to_string()]);
        assert_eq!(
            *handler.seen.lock().await,
            vec![("conn-1".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_oversized_frames_never_reach_handler() {
        let socket = ScriptedSocket {
            inbound: VecDeque::from(vec![
                "x".repeat(MAX_INBOUND_FRAME_BYTES + 1),
                "ok".to_string(),
            ]),
            sent: Arc::new(Mutex::new(Vec::new())),
        };
        let handler = Arc::new(RecordingHandler::default());
        let (tx, rx) = mpsc::unbounded_channel::<String>();

        let connection = Connection::new("conn-1".to_string(), Box::new(socket), rx, handler.clone());
        let task = tokio::spawn(connection.run());

        while handler.seen.lock().await.is_empty() {
            tokio::task::yield_now().await;
        }
        drop(tx);

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.frames_dropped, 1);
        assert_eq!(summary.frames_in, 1);
        assert_eq!(
            *handler.seen.lock().await,
            vec![("conn-1".to_string(), "ok".to_string())]
        );
    }
}
