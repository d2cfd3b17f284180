use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::clock::GameClock;
use super::room::{
    validate_username, Player, PlayerId, Room, RoomListing, RoomSummary, SessionId,
};
use crate::error::{QuizError, Result};
use crate::questions::QuestionSource;

pub const MAX_ROOMS: usize = 10;
pub const MIN_TIME_LIMIT_MINUTES: i64 = 3;
pub const MAX_TIME_LIMIT_MINUTES: i64 = 10;
pub const MIN_QUESTIONS: i64 = 10;
pub const MAX_QUESTIONS: i64 = 25;

/// Room codes are four digits
const ROOM_CODE_SPACE: u32 = 10_000;
const MAX_CODE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(rename = "timeLimit")]
    pub time_limit: i64,
    #[serde(rename = "numQuestions")]
    pub num_questions: i64,
    #[serde(rename = "gameType")]
    pub game_type: String,
    #[serde(rename = "hostUsername", default)]
    pub host_username: String,
}

impl CreateRoomRequest {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TIME_LIMIT_MINUTES..=MAX_TIME_LIMIT_MINUTES).contains(&self.time_limit) {
            return Err(QuizError::validation(format!(
                "time limit must be between {} and {} minutes",
                MIN_TIME_LIMIT_MINUTES, MAX_TIME_LIMIT_MINUTES
            )));
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.num_questions) {
            return Err(QuizError::validation(format!(
                "number of questions must be between {} and {}",
                MIN_QUESTIONS, MAX_QUESTIONS
            )));
        }
        if self.game_type.is_empty() {
            return Err(QuizError::validation("game type is required"));
        }
        if self.host_username.is_empty() {
            return Err(QuizError::validation("Host username is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomRequest {
    pub username: String,
    #[serde(rename = "roomID", alias = "roomCode")]
    pub room_code: String,
}

/// Process-wide map from room code to room.
///
/// Lock order is registry, then room. Nothing holds a room lock while
/// waiting for the registry lock.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    questions: Arc<dyn QuestionSource>,
    clock: GameClock,
    next_player_id: AtomicU64,
    next_session_id: AtomicU64,
}

impl RoomRegistry {
    pub fn new(questions: Arc<dyn QuestionSource>, clock: GameClock) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            questions,
            clock,
            next_player_id: AtomicU64::new(1),
            next_session_id: AtomicU64::new(1),
        })
    }

    pub fn clock(&self) -> GameClock {
        self.clock
    }

    pub fn questions(&self) -> Arc<dyn QuestionSource> {
        self.questions.clone()
    }

    pub(crate) fn next_player_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_room_code() -> String {
        let mut rng = rand::thread_rng();
        format!("{:04}", rng.gen_range(0..ROOM_CODE_SPACE))
    }

    /// Create a room with a fresh code and a freshly drawn question list
    pub async fn create(&self, request: &CreateRoomRequest) -> Result<Arc<Room>> {
        request.validate()?;

        if self.rooms.read().await.len() >= MAX_ROOMS {
            return Err(QuizError::RoomLimitReached);
        }

        let count = request.num_questions as usize;
        let questions = self.questions.generate(count, &request.game_type)?;
        if questions.len() < count {
            return Err(QuizError::QuestionBank(format!(
                "only {} questions available, {} requested",
                questions.len(),
                count
            )));
        }

        let mut rooms = self.rooms.write().await;
        if rooms.len() >= MAX_ROOMS {
            return Err(QuizError::RoomLimitReached);
        }

        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| Self::generate_room_code())
            .find(|code| !rooms.contains_key(code))
            .ok_or_else(|| QuizError::internal("could not allocate a free room code"))?;

        let room = Arc::new(Room::new(
            code.clone(),
            request.host_username.clone(),
            questions,
            request.time_limit as u32,
            request.game_type.clone(),
        ));
        rooms.insert(code.clone(), room.clone());

        tracing::info!(
            room_code = %code,
            host = %request.host_username,
            game_mode = %request.game_type,
            num_questions = count,
            "Room created"
        );
        Ok(room)
    }

    pub async fn get(&self, code: &str) -> Result<Arc<Room>> {
        self.rooms
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| QuizError::RoomNotFound(code.to_string()))
    }

    #[cfg(test)]
    pub(crate) async fn room_exists(&self, code: &str) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    #[cfg(test)]
    pub(crate) async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Remove a room by code and close its connections. Idempotent.
    pub async fn delete(&self, code: &str) -> bool {
        let room = self.rooms.write().await.remove(code);
        match room {
            Some(room) => {
                room.close().await;
                tracing::info!(room_code = %code, "Room deleted");
                true
            }
            None => false,
        }
    }

    /// Remove this exact room (not a newer one reusing its code) and close it
    pub async fn remove_room(&self, room: &Arc<Room>) -> bool {
        let removed = {
            let mut rooms = self.rooms.write().await;
            match rooms.get(room.code()) {
                Some(existing) if Arc::ptr_eq(existing, room) => {
                    rooms.remove(room.code());
                    true
                }
                _ => false,
            }
        };

        room.close().await;
        if removed {
            tracing::info!(room_code = %room.code(), "Room has been closed");
        }
        removed
    }

    /// Join pre-check. Does not allocate a player.
    pub async fn check_join(&self, request: &JoinRoomRequest) -> Result<RoomSummary> {
        validate_username(&request.username)?;
        if request.room_code.is_empty() {
            return Err(QuizError::validation("Room ID is required"));
        }

        let room = self.get(&request.room_code).await?;
        room.check_joinable(&request.username).await?;
        Ok(room.summary().await)
    }

    /// Deregister a connection and reclaim the room once it is empty
    pub async fn remove_player(&self, room: &Arc<Room>, session: SessionId) -> Option<Player> {
        let removal = room.remove_player(session).await;
        if removal.emptied {
            self.remove_room(room).await;
        }
        removal.player
    }

    pub async fn list(&self) -> Vec<RoomListing> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut listings = Vec::with_capacity(rooms.len());
        for room in rooms {
            let summary = room.summary().await;
            listings.push(RoomListing {
                game_started: summary.start,
                summary,
            });
        }
        listings.sort_by(|a, b| a.summary.code.cmp(&b.summary.code));
        listings
    }

    /// Remove every room whose player set is empty
    pub async fn sweep_empty(&self) -> usize {
        let mut rooms = self.rooms.write().await;

        let mut empty = Vec::new();
        for (code, room) in rooms.iter() {
            if room.close_if_empty().await {
                empty.push(code.clone());
            }
        }

        for code in &empty {
            if let Some(room) = rooms.remove(code) {
                room.abort_clock_task();
                tracing::info!(room_code = %code, "Deleting empty room");
            }
        }
        empty.len()
    }

    /// Sweep empty rooms on a fixed interval, independent of connection activity
    pub fn start_cleanup(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = self.sweep_empty().await;
                if removed > 0 {
                    tracing::info!(removed, "Swept empty rooms");
                }
            }
        })
    }
}
