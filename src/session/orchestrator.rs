use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::{SessionCommand, SessionError};
use crate::clock::GameClock;
use crate::config::SessionConfig;
use crate::connection::ConnectionRegistry;
use crate::matchmaking::{MatchmakingEntry, MatchmakingQueue};
use crate::room::{MatchOutcome, RoomPhase, RoomRegistry};
use crate::stats::{MatchRecord, StatsAggregator};
use crate::websockets::{ClientEvent, ConnectionManager, MessageType, WebSocketMessage};

/// Owns every room, the connection registry and the matchmaking queue, and
/// applies one command at a time. Nothing outside this loop touches them.
pub struct SessionOrchestrator {
    config: SessionConfig,
    connections: ConnectionRegistry,
    rooms: RoomRegistry,
    queue: MatchmakingQueue,
    outbound: Arc<dyn ConnectionManager>,
    stats: StatsAggregator,
    // Timers post back into the loop through this
    commands: mpsc::UnboundedSender<SessionCommand>,
    next_clock_id: u64,
}

impl SessionOrchestrator {
    pub fn new(
        config: SessionConfig,
        outbound: Arc<dyn ConnectionManager>,
        stats: StatsAggregator,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            queue: MatchmakingQueue::new(config.matchmaking_timeout),
            config,
            connections: ConnectionRegistry::new(),
            rooms: RoomRegistry::new(),
            outbound,
            stats,
            commands,
            next_clock_id: 1,
        }
    }

    /// Builds an orchestrator together with the inbox its timers post into
    pub fn with_channel(
        config: SessionConfig,
        outbound: Arc<dyn ConnectionManager>,
        stats: StatsAggregator,
    ) -> (Self, mpsc::UnboundedReceiver<SessionCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, outbound, stats, tx), rx)
    }

    /// Another sender into this orchestrator's inbox
    pub fn command_sender(&self) -> mpsc::UnboundedSender<SessionCommand> {
        self.commands.clone()
    }

    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SessionCommand>) {
        info!("Session loop started");

        while let Some(command) = inbox.recv().await {
            self.handle(command).await;
        }

        warn!("Session loop ended - no more commands");
    }

    /// Processes a single command to completion
    pub async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connected { connection_id } => {
                self.connections.register(&connection_id);
            }
            SessionCommand::Client {
                connection_id,
                event,
            } => {
                if let Err(e) = self.handle_client_event(&connection_id, event).await {
                    info!(
                        connection_id = %connection_id,
                        error = %e,
                        "Client event rejected"
                    );
                    self.send(&connection_id, WebSocketMessage::error(e.to_string()))
                        .await;
                }
            }
            SessionCommand::Disconnected { connection_id } => {
                self.handle_disconnect(&connection_id).await;
            }
            SessionCommand::BeginClock { room_code } => {
                self.begin_clock(&room_code).await;
            }
            SessionCommand::ClockTick {
                room_code,
                clock_id,
            } => {
                self.clock_tick(&room_code, clock_id).await;
            }
            SessionCommand::RemoveFinished { room_code } => {
                self.remove_finished(&room_code);
            }
            SessionCommand::ListRooms { reply } => {
                let _ = reply.send(self.rooms.list());
            }
        }
    }

    async fn handle_client_event(
        &mut self,
        connection_id: &str,
        event: ClientEvent,
    ) -> Result<(), SessionError> {
        debug!(connection_id = %connection_id, event = ?event, "Handling client event");

        match event {
            ClientEvent::Authenticate { username } => {
                self.connections.bind(connection_id, &username);
                self.send(connection_id, WebSocketMessage::authenticated(&username))
                    .await;
                Ok(())
            }
            ClientEvent::CreateRoom { username } => {
                self.create_room(connection_id, &username).await;
                Ok(())
            }
            ClientEvent::JoinRoom {
                room_code,
                username,
            } => self.join_room(connection_id, &room_code, &username).await,
            ClientEvent::RejoinRoom {
                room_code,
                username,
            } => self.rejoin_room(connection_id, &room_code, &username).await,
            ClientEvent::FindMatch { username } => self.find_match(connection_id, &username).await,
            ClientEvent::CancelMatchmaking => {
                let removed = self.queue.remove(connection_id);
                debug!(connection_id = %connection_id, removed, "Matchmaking cancelled");
                self.send(connection_id, WebSocketMessage::matchmaking_cancelled())
                    .await;
                Ok(())
            }
            ClientEvent::StartGame { room_code } => {
                if !self.rooms.contains(&room_code) {
                    return Err(SessionError::RoomNotFound);
                }
                self.attempt_start(&room_code).await
            }
            ClientEvent::UpdateScore { room_code, score } => {
                self.update_score(connection_id, &room_code, score).await;
                Ok(())
            }
            ClientEvent::GameFinished {
                room_code,
                final_score,
            } => {
                self.record_final_score(connection_id, &room_code, final_score);
                Ok(())
            }
            ClientEvent::LeaveRoom { room_code } => {
                self.leave(connection_id, &room_code).await;
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_room(&mut self, connection_id: &str, username: &str) {
        self.connections.bind(connection_id, username);
        self.leave_current_room(connection_id, None).await;

        let room = self
            .rooms
            .create(username, connection_id, self.config.room_capacity);
        let info = room.info();
        self.connections
            .set_room(connection_id, Some(&info.room_code));

        self.send(
            connection_id,
            WebSocketMessage::room(MessageType::RoomCreated, info, None),
        )
        .await;
    }

    #[instrument(skip(self))]
    async fn join_room(
        &mut self,
        connection_id: &str,
        room_code: &str,
        username: &str,
    ) -> Result<(), SessionError> {
        self.connections.bind(connection_id, username);

        let room = self
            .rooms
            .get_mut(room_code)
            .ok_or(SessionError::RoomNotFound)?;
        room.add_player(username, connection_id)?;
        let info = room.info();
        let members = room.connection_ids();
        self.leave_current_room(connection_id, Some(room_code)).await;
        self.connections.set_room(connection_id, Some(room_code));

        info!(
            room_code = %room_code,
            username = %username,
            players = info.players.len(),
            "Player joined room"
        );
        self.broadcast(
            &members,
            WebSocketMessage::room(MessageType::PlayerJoined, info, Some(username)),
        )
        .await;
        Ok(())
    }

    /// Page-transition handshake: re-attach the player to this connection and
    /// mark them ready. The match starts once every seat is ready.
    #[instrument(skip(self))]
    async fn rejoin_room(
        &mut self,
        connection_id: &str,
        room_code: &str,
        username: &str,
    ) -> Result<(), SessionError> {
        self.connections.bind(connection_id, username);

        let room = self
            .rooms
            .get_mut(room_code)
            .ok_or(SessionError::RoomNotFound)?;
        if !room.rebind(username, connection_id) {
            room.add_player(username, connection_id)?;
        }
        room.mark_ready(username);

        let all_ready =
            room.phase() == RoomPhase::Waiting && room.ready_count() >= room.capacity();
        let info = room.info();
        self.leave_current_room(connection_id, Some(room_code)).await;
        self.connections.set_room(connection_id, Some(room_code));

        self.send(
            connection_id,
            WebSocketMessage::room(MessageType::RejoinedRoom, info, Some(username)),
        )
        .await;

        if all_ready {
            self.attempt_start(room_code).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_match(&mut self, connection_id: &str, username: &str) -> Result<(), SessionError> {
        self.connections.bind(connection_id, username);

        if let Some(position) = self.queue.position_of(connection_id) {
            self.send(connection_id, WebSocketMessage::searching(position))
                .await;
            return Ok(());
        }

        let connections = &self.connections;
        let outcome = self.queue.dequeue_next(|id| connections.is_live(id));
        for entry in outcome.timed_out() {
            self.send(
                &entry.connection_id,
                WebSocketMessage::matchmaking_timeout(SessionError::MatchmakingTimeout.to_string()),
            )
            .await;
        }

        let Some(opponent) = outcome.entry else {
            self.enqueue_requester(connection_id, username).await;
            return Ok(());
        };

        // Double-check the opponent right before forming the room
        if !self.connections.is_live(&opponent.connection_id) {
            warn!(
                connection_id = %opponent.connection_id,
                error = %SessionError::StaleConnection,
                "Matched entry went stale, re-queuing requester"
            );
            self.enqueue_requester(connection_id, username).await;
            return Ok(());
        }

        // One username cannot fill both seats; the waiting entry keeps its place
        if opponent.username == username {
            warn!(
                connection_id = %connection_id,
                waiting_connection = %opponent.connection_id,
                username = %username,
                "Same username already searching"
            );
            self.queue.requeue_front(opponent);
            return Err(SessionError::AlreadySearching);
        }

        for member in [opponent.connection_id.as_str(), connection_id] {
            self.leave_current_room(member, None).await;
        }

        let room = self.rooms.create(
            &opponent.username,
            &opponent.connection_id,
            self.config.room_capacity,
        );
        room.add_player(username, connection_id)?;
        let info = room.info();
        let members = room.connection_ids();

        for member in &members {
            self.connections.set_room(member, Some(&info.room_code));
        }

        info!(
            room_code = %info.room_code,
            players = ?info.players,
            "Match found"
        );
        self.broadcast(
            &members,
            WebSocketMessage::room(MessageType::MatchFound, info, None),
        )
        .await;
        Ok(())
    }

    async fn enqueue_requester(&mut self, connection_id: &str, username: &str) {
        let position = self
            .queue
            .enqueue(MatchmakingEntry::new(connection_id, username));
        info!(
            connection_id = %connection_id,
            username = %username,
            position,
            "Waiting for an opponent"
        );
        self.send(connection_id, WebSocketMessage::searching(position))
            .await;
    }

    /// Single entry point for `waiting -> playing`, shared by the host start
    /// and the rejoin handshake
    #[instrument(skip(self))]
    async fn attempt_start(&mut self, room_code: &str) -> Result<(), SessionError> {
        let room = self
            .rooms
            .get_mut(room_code)
            .ok_or(SessionError::RoomNotFound)?;
        room.begin_match(Utc::now())?;
        let members = room.connection_ids();

        info!(
            room_code = %room_code,
            players = ?room.usernames(),
            "Match starting"
        );
        self.broadcast(
            &members,
            WebSocketMessage::game_starting(self.config.countdown_seconds),
        )
        .await;
        self.schedule(
            self.config.clock_start_delay,
            SessionCommand::BeginClock {
                room_code: room_code.to_string(),
            },
        );
        Ok(())
    }

    async fn begin_clock(&mut self, room_code: &str) {
        let seconds = self.config.match_seconds();
        let period = self.config.tick_interval;

        let Some(room) = self.rooms.get_mut(room_code) else {
            debug!(room_code = %room_code, "Room gone before clock start");
            return;
        };
        if room.phase() != RoomPhase::Playing || room.clock().is_some() {
            debug!(room_code = %room_code, phase = %room.phase(), "Skipping clock start");
            return;
        }

        let clock_id = self.next_clock_id;
        self.next_clock_id += 1;

        let commands = self.commands.clone();
        let code = room_code.to_string();
        room.set_clock(GameClock::start(clock_id, seconds, period, move || {
            commands
                .send(SessionCommand::ClockTick {
                    room_code: code.clone(),
                    clock_id,
                })
                .is_ok()
        }));
        let members = room.connection_ids();

        info!(room_code = %room_code, clock_id, seconds, "Game clock started");
        self.broadcast(&members, WebSocketMessage::game_started(seconds))
            .await;
    }

    async fn clock_tick(&mut self, room_code: &str, clock_id: u64) {
        let Some(room) = self.rooms.get_mut(room_code) else {
            return;
        };
        if room.phase() != RoomPhase::Playing {
            return;
        }
        let time_left = match room.clock_mut() {
            Some(clock) if clock.id() == clock_id => clock.tick(),
            _ => {
                debug!(room_code = %room_code, clock_id, "Ignoring tick from a superseded clock");
                return;
            }
        };
        let members = room.connection_ids();

        self.broadcast(&members, WebSocketMessage::timer_update(time_left))
            .await;

        if time_left == 0 {
            self.end_match(room_code).await;
        }
    }

    /// Clock expiry: rank by score, broadcast `gameOver`, persist
    #[instrument(skip(self))]
    async fn end_match(&mut self, room_code: &str) {
        let Some(room) = self.rooms.get_mut(room_code) else {
            return;
        };
        if !room.finish() {
            return;
        }

        let players = room.usernames();
        let outcome = MatchOutcome::from_scores(&players, room.scores());
        let members = room.connection_ids();
        let ended_at = Utc::now();
        let record = MatchRecord::new(
            room_code,
            players,
            &outcome,
            room.started_at().unwrap_or(ended_at),
            ended_at,
        );

        info!(
            room_code = %room_code,
            winner = ?outcome.winner,
            is_draw = outcome.is_draw,
            "Match over"
        );
        self.broadcast(
            &members,
            WebSocketMessage::outcome(MessageType::GameOver, &outcome),
        )
        .await;
        self.conclude(room_code, &outcome, &record).await;
    }

    /// Mid-match departure: the remaining player wins immediately
    #[instrument(skip(self))]
    async fn forfeit(&mut self, room_code: &str, departed: &str) {
        let Some(room) = self.rooms.get_mut(room_code) else {
            return;
        };
        let Some(remaining) = room
            .players()
            .iter()
            .find(|p| p.username != departed)
            .map(|p| p.username.clone())
        else {
            return;
        };
        if !room.finish() {
            return;
        }

        let players = room.usernames();
        let remaining_score = room.score_of(&remaining).unwrap_or_default();
        let outcome = MatchOutcome::forfeit(&remaining, remaining_score, departed);
        room.remove_player(departed);
        let members = room.connection_ids();
        let ended_at = Utc::now();
        let record = MatchRecord::new(
            room_code,
            players,
            &outcome,
            room.started_at().unwrap_or(ended_at),
            ended_at,
        );

        info!(
            room_code = %room_code,
            departed = %departed,
            winner = %remaining,
            "Player left mid-match, forfeit"
        );
        self.broadcast(
            &members,
            WebSocketMessage::outcome(MessageType::OpponentDisconnected, &outcome),
        )
        .await;
        self.conclude(room_code, &outcome, &record).await;
    }

    /// Stats update and match log append for a finished room, then schedule
    /// its removal. Store failures are logged and never reach clients.
    async fn conclude(&self, room_code: &str, outcome: &MatchOutcome, record: &MatchRecord) {
        if let Err(e) = self.stats.apply(outcome).await {
            error!(room_code = %room_code, error = %e, "Failed to update user stats");
        }
        if let Err(e) = self.stats.record_match(record).await {
            error!(room_code = %room_code, error = %e, "Failed to append match record");
        }

        self.schedule(
            self.config.finished_grace,
            SessionCommand::RemoveFinished {
                room_code: room_code.to_string(),
            },
        );
    }

    async fn update_score(&mut self, connection_id: &str, room_code: &str, score: u32) {
        let Some(username) = self.connections.lookup(connection_id).map(str::to_string) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(room_code) else {
            return;
        };
        if room.phase() != RoomPhase::Playing || !room.set_score(&username, score) {
            debug!(room_code = %room_code, username = %username, "Ignoring score update");
            return;
        }
        let scores = room.scores().clone();
        let members = room.connection_ids();

        self.broadcast(&members, WebSocketMessage::scores_update(scores))
            .await;
    }

    /// Stores the client-reported final score in any phase. Never ends the match.
    fn record_final_score(&mut self, connection_id: &str, room_code: &str, final_score: u32) {
        let Some(username) = self.connections.lookup(connection_id).map(str::to_string) else {
            return;
        };
        if let Some(room) = self.rooms.get_mut(room_code) {
            room.set_score(&username, final_score);
        }
    }

    #[instrument(skip(self))]
    async fn handle_disconnect(&mut self, connection_id: &str) {
        self.queue.remove(connection_id);
        let Some(entry) = self.connections.unbind(connection_id) else {
            return;
        };

        info!(
            connection_id = %connection_id,
            username = ?entry.username,
            room_code = ?entry.room_code,
            "Connection closed"
        );
        if let Some(room_code) = entry.room_code {
            self.leave(connection_id, &room_code).await;
        }
    }

    /// Shared by `leaveRoom` and transport close. Only the connection that
    /// currently owns a player record can remove it, so a stale connection
    /// closing after a rejoin leaves the room untouched.
    async fn leave(&mut self, connection_id: &str, room_code: &str) {
        self.queue.remove(connection_id);
        self.connections.set_room(connection_id, None);

        let Some(room) = self.rooms.get_mut(room_code) else {
            debug!(room_code = %room_code, "Leave for unknown room");
            return;
        };
        let Some(username) = room
            .player_by_connection(connection_id)
            .map(|p| p.username.clone())
        else {
            debug!(
                room_code = %room_code,
                connection_id = %connection_id,
                "Connection holds no seat in room"
            );
            return;
        };

        if room.phase() == RoomPhase::Playing && room.player_count() == 2 {
            self.forfeit(room_code, &username).await;
            return;
        }

        room.remove_player(&username);
        if room.is_empty() {
            self.rooms.remove(room_code);
            info!(room_code = %room_code, "Last player left, room removed");
            return;
        }

        let info = room.info();
        let members = room.connection_ids();
        info!(
            room_code = %room_code,
            username = %username,
            host = %info.host,
            "Player left room"
        );
        self.broadcast(
            &members,
            WebSocketMessage::room(MessageType::PlayerLeft, info, Some(username.as_str())),
        )
        .await;
    }

    /// A connection sits in at most one room. Moving to another room runs the
    /// regular leave flow on the one it is in now.
    async fn leave_current_room(&mut self, connection_id: &str, next_room: Option<&str>) {
        let Some(previous) = self.connections.room_of(connection_id).map(str::to_string) else {
            return;
        };
        if next_room == Some(previous.as_str()) {
            return;
        }
        debug!(
            connection_id = %connection_id,
            room_code = %previous,
            "Leaving previous room"
        );
        self.leave(connection_id, &previous).await;
    }

    fn remove_finished(&mut self, room_code: &str) {
        match self.rooms.get(room_code) {
            Some(room) if room.phase() == RoomPhase::Finished => {
                self.rooms.remove(room_code);
                self.connections.clear_room(room_code);
                info!(room_code = %room_code, "Finished room removed");
            }
            _ => debug!(room_code = %room_code, "No finished room to remove"),
        }
    }

    fn schedule(&self, delay: Duration, command: SessionCommand) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if commands.send(command).is_err() {
                debug!("Session loop gone, dropping scheduled command");
            }
        });
    }

    async fn send(&self, connection_id: &str, message: WebSocketMessage) {
        match message.to_json() {
            Ok(text) => self.outbound.send_to_connection(connection_id, &text).await,
            Err(e) => error!(error = %e, "Failed to serialize outbound message"),
        }
    }

    async fn broadcast(&self, connection_ids: &[String], message: WebSocketMessage) {
        match message.to_json() {
            Ok(text) => self.outbound.send_to_connections(connection_ids, &text).await,
            Err(e) => error!(error = %e, "Failed to serialize outbound message"),
        }
    }
}
