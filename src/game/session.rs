use std::sync::Arc;

use super::clock;
use super::events::{ClientEvent, Envelope, Handshake, ServerEvent};
use super::registry::RoomRegistry;
use super::room::{validate_username, Player, PlayerSender, Room, SessionId};
use crate::error::{QuizError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Joined,
    InGame,
    Left,
}

/// What the connection loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Per-connection protocol state machine, bound to one player in one room
pub struct Session {
    registry: Arc<RoomRegistry>,
    room: Arc<Room>,
    id: SessionId,
    player: Player,
    state: SessionState,
}

impl Session {
    /// Complete the handshake: resolve the room, allocate the player and
    /// announce it. Nothing is mutated on failure.
    pub async fn connect(
        registry: Arc<RoomRegistry>,
        handshake: Handshake,
        sender: PlayerSender,
    ) -> Result<Self> {
        validate_username(&handshake.username)?;
        let room = registry.get(&handshake.room_code).await?;

        let id = registry.next_session_id();
        let player = Player::new(registry.next_player_id(), handshake.username);
        room.admit(id, player.clone(), sender).await?;

        Ok(Self {
            registry,
            room,
            id,
            player,
            state: SessionState::Joined,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Decode one inbound text frame and handle it
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    room_code = %self.room.code(),
                    player_id = %self.player.id,
                    error = %e,
                    "Failed to parse message"
                );
                self.report_error("Invalid message format").await;
                return Flow::Continue;
            }
        };

        match ClientEvent::from_envelope(envelope) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                self.report_error(&e.to_string()).await;
                Flow::Continue
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) -> Flow {
        match event {
            ClientEvent::Leave => {
                tracing::info!(
                    room_code = %self.room.code(),
                    username = %self.player.username,
                    "Player requested to leave"
                );
                self.deregister().await;
                return Flow::Terminate;
            }
            ClientEvent::LoadGame => {
                self.state = SessionState::InGame;
                clock::load_game(&self.registry, &self.room).await;
            }
            ClientEvent::GetNewQuestion { question_number } => {
                self.state = SessionState::InGame;
                self.send_question(question_number).await;
            }
            ClientEvent::ValidateAnswer {
                question_index,
                answer,
            } => {
                self.state = SessionState::InGame;
                self.validate_answer(question_index, &answer).await;
            }
            ClientEvent::CleanRoom => self.clean_room().await,
            ClientEvent::Unknown(name) => {
                tracing::debug!(
                    room_code = %self.room.code(),
                    event = %name,
                    "Ignoring unknown event"
                );
            }
        }
        Flow::Continue
    }

    async fn send_question(&self, question_number: i64) {
        let payload = match self.room.question_payload(question_number) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(room_code = %self.room.code(), error = %e, "Failed to get question");
                self.report_error("Failed to get question").await;
                return;
            }
        };

        if let Err(e) = self
            .room
            .send_to_player(self.player.id, &ServerEvent::NewQuestion(payload))
            .await
        {
            tracing::warn!(
                room_code = %self.room.code(),
                player_id = %self.player.id,
                error = %e,
                "Error sending question to player"
            );
        }
    }

    async fn validate_answer(&mut self, question_index: i64, answer: &str) {
        match self
            .room
            .record_answer(self.player.id, question_index, answer)
            .await
        {
            Ok(outcome) => {
                self.player.score = outcome.score;
                self.player.completed = outcome.completed;
            }
            Err(e @ QuizError::Validation(_)) => self.report_error(&e.to_string()).await,
            Err(e) => {
                tracing::warn!(
                    room_code = %self.room.code(),
                    player_id = %self.player.id,
                    error = %e,
                    "Error validating answer"
                );
            }
        }
    }

    /// Tear the room down once every player has finished
    async fn clean_room(&self) {
        if !self.room.all_completed().await {
            tracing::debug!(room_code = %self.room.code(), "clean_room before everyone finished");
            return;
        }
        self.registry.remove_room(&self.room).await;
    }

    async fn report_error(&self, error: &str) {
        if let Err(e) = self.room.send_error(self.player.id, error).await {
            tracing::debug!(
                room_code = %self.room.code(),
                player_id = %self.player.id,
                error = %e,
                "Could not report protocol error"
            );
        }
    }

    async fn deregister(&mut self) {
        if self.state == SessionState::Left {
            return;
        }
        self.state = SessionState::Left;
        self.registry.remove_player(&self.room, self.id).await;
    }

    /// Connection ended (leave, read failure or close). Safe after `leave`.
    pub async fn disconnect(mut self) {
        tracing::info!(
            room_code = %self.room.code(),
            username = %self.player.username,
            "Session closed"
        );
        self.deregister().await;
    }
}
