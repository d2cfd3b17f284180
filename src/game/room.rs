use std::collections::HashMap;
use std::fmt;
use std::sync::PoisonError;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use warp::ws::Message;

use super::broadcast;
use super::events::{ErrorMessage, QuestionPayload, ServerEvent};
use crate::error::{QuizError, Result};
use crate::questions::Question;

pub const MAX_PLAYERS_PER_ROOM: usize = 9;
pub const USERNAME_MIN_CHARS: usize = 4;
pub const USERNAME_MAX_CHARS: usize = 20;

/// Outbound half of a player's connection
pub type PlayerSender = mpsc::UnboundedSender<Message>;

/// Server-assigned player identifier, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for one connection; keys a room's player set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(QuizError::validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
    pub completed: bool,
}

impl Player {
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            score: 0,
            completed: false,
        }
    }
}

pub(crate) struct PlayerEntry {
    pub player: Player,
    pub sender: PlayerSender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    CountingDown,
    Started,
}

pub(crate) struct RoomState {
    pub players: HashMap<SessionId, PlayerEntry>,
    pub phase: GamePhase,
    /// Set once the room is unlinked from the registry; closed rooms admit nobody
    pub closed: bool,
}

impl RoomState {
    fn username_taken(&self, username: &str) -> bool {
        let username = username.to_lowercase();
        self.players
            .values()
            .any(|entry| entry.player.username.to_lowercase() == username)
    }

    fn all_completed(&self) -> bool {
        self.players.values().all(|entry| entry.player.completed)
    }

    fn joinable(&self, username: &str) -> Result<()> {
        if self.closed {
            return Err(QuizError::RoomNotFound(String::new()));
        }
        if self.phase != GamePhase::Lobby {
            return Err(QuizError::AlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS_PER_ROOM {
            return Err(QuizError::RoomFull);
        }
        if self.username_taken(username) {
            return Err(QuizError::UsernameTaken(username.to_string()));
        }
        Ok(())
    }

    fn player_summaries(&self) -> Vec<PlayerSummary> {
        let mut players: Vec<PlayerSummary> = self
            .players
            .values()
            .map(|entry| PlayerSummary {
                id: entry.player.id,
                username: entry.player.username.clone(),
                score: entry.player.score,
            })
            .collect();
        players.sort_by_key(|p| p.id);
        players
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub code: String,
    pub host: String,
    pub players: Vec<PlayerSummary>,
    #[serde(rename = "timeLimit")]
    pub time_limit: u32,
    #[serde(rename = "numQuestions")]
    pub num_questions: usize,
    pub gamemode: String,
    pub start: bool,
}

/// Admin view of a live room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListing {
    #[serde(flatten)]
    pub summary: RoomSummary,
    #[serde(rename = "gameStarted")]
    pub game_started: bool,
}

/// Result of removing a connection from a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub player: Option<Player>,
    /// The player set is now empty and the room was closed
    pub emptied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub score: u32,
    pub completed: bool,
    pub all_finished: bool,
}

/// One game session. Settings and questions are fixed at creation; the
/// player set and phase live behind a per-room lock.
pub struct Room {
    code: String,
    host_name: String,
    questions: Vec<Question>,
    time_limit_minutes: u32,
    game_mode: String,
    state: Mutex<RoomState>,
    clock_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("game_mode", &self.game_mode)
            .field("questions", &self.questions.len())
            .field("time_limit_minutes", &self.time_limit_minutes)
            .finish_non_exhaustive()
    }
}

impl Room {
    pub fn new(
        code: impl Into<String>,
        host_name: impl Into<String>,
        questions: Vec<Question>,
        time_limit_minutes: u32,
        game_mode: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            host_name: host_name.into(),
            questions,
            time_limit_minutes,
            game_mode: game_mode.into(),
            state: Mutex::new(RoomState {
                players: HashMap::new(),
                phase: GamePhase::Lobby,
                closed: false,
            }),
            clock_task: std::sync::Mutex::new(None),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[cfg(test)]
    pub(crate) fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    fn question_at(&self, index: i64) -> Option<&Question> {
        usize::try_from(index).ok().and_then(|i| self.questions.get(i))
    }

    #[cfg(test)]
    pub(crate) async fn is_started(&self) -> bool {
        self.state.lock().await.phase == GamePhase::Started
    }

    #[cfg(test)]
    pub(crate) async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    #[cfg(test)]
    pub(crate) async fn players(&self) -> Vec<Player> {
        let state = self.state.lock().await;
        let mut players: Vec<Player> = state.players.values().map(|e| e.player.clone()).collect();
        players.sort_by_key(|p| p.id);
        players
    }

    pub async fn summary(&self) -> RoomSummary {
        let state = self.state.lock().await;
        RoomSummary {
            code: self.code.clone(),
            host: self.host_name.clone(),
            players: state.player_summaries(),
            time_limit: self.time_limit_minutes,
            num_questions: self.questions.len(),
            gamemode: self.game_mode.clone(),
            start: state.phase == GamePhase::Started,
        }
    }

    /// Join pre-check: does not allocate a player
    pub async fn check_joinable(&self, username: &str) -> Result<()> {
        let state = self.state.lock().await;
        state
            .joinable(username)
            .map_err(|e| self.with_code(e))
    }

    /// Register a connection and announce the player to everyone, the joiner included
    pub async fn admit(&self, session: SessionId, player: Player, sender: PlayerSender) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .joinable(&player.username)
            .map_err(|e| self.with_code(e))?;

        let joined = ServerEvent::PlayerJoined {
            username: player.username.clone(),
            score: player.score,
            id: player.id,
        };

        tracing::info!(
            room_code = %self.code,
            player_id = %player.id,
            username = %player.username,
            "Player joined room"
        );

        state.players.insert(session, PlayerEntry { player, sender });
        broadcast::broadcast(&self.code, &mut state, &joined);
        Ok(())
    }

    /// Deregister a connection. Removing an absent session is a no-op.
    pub async fn remove_player(&self, session: SessionId) -> Removal {
        let mut state = self.state.lock().await;

        let player = state.players.remove(&session).map(|entry| entry.player);
        if let Some(player) = &player {
            tracing::info!(
                room_code = %self.code,
                player_id = %player.id,
                username = %player.username,
                "Player left room"
            );
            broadcast::broadcast(
                &self.code,
                &mut state,
                &ServerEvent::PlayerLeft {
                    username: player.username.clone(),
                    id: player.id,
                },
            );
        }

        let emptied = state.players.is_empty() && !state.closed;
        if emptied {
            state.closed = true;
        }

        Removal { player, emptied }
    }

    /// Deliver an event to every player, evicting connections that fail
    pub async fn broadcast(&self, event: &ServerEvent) -> Vec<Player> {
        let mut state = self.state.lock().await;
        broadcast::broadcast(&self.code, &mut state, event)
    }

    pub async fn send_to_player(&self, player_id: PlayerId, event: &ServerEvent) -> Result<()> {
        let message = event.to_message()?;
        let mut state = self.state.lock().await;
        broadcast::send_to_player(&self.code, &mut state, player_id, message)
    }

    pub async fn send_error(&self, player_id: PlayerId, error: &str) -> Result<()> {
        let message = ErrorMessage::new(error).to_message()?;
        let mut state = self.state.lock().await;
        broadcast::send_to_player(&self.code, &mut state, player_id, message)
    }

    /// Question as shown to players; MCQ rooms include the options
    pub fn question_payload(&self, index: i64) -> Result<QuestionPayload> {
        let question = self.question_at(index).ok_or_else(|| {
            QuizError::validation(format!(
                "question number {} is out of range; total questions available: {}",
                index,
                self.questions.len()
            ))
        })?;

        Ok(QuestionPayload {
            flag_url: question.flag_url.clone(),
            options: if self.game_mode == "MCQ" {
                question.options.clone()
            } else {
                None
            },
        })
    }

    /// Check an answer, tell the player the result, and update scores and
    /// completion for the whole room.
    pub async fn record_answer(
        &self,
        player_id: PlayerId,
        index: i64,
        answer: &str,
    ) -> Result<AnswerOutcome> {
        let question = self
            .question_at(index)
            .ok_or_else(|| QuizError::validation("Invalid question index"))?;
        let correct = question.answer == answer;
        let is_last = usize::try_from(index).map_or(false, |i| i + 1 == self.questions.len());

        let result = ServerEvent::AnswerResult {
            correct_answer: question.answer.clone(),
            chosen_answer: answer.to_string(),
        }
        .to_message()?;

        let mut state = self.state.lock().await;
        broadcast::send_to_player(&self.code, &mut state, player_id, result)?;

        let (username, score, completed) = {
            let entry = state
                .players
                .values_mut()
                .find(|entry| entry.player.id == player_id)
                .ok_or_else(|| QuizError::PlayerNotFound(player_id.to_string()))?;
            if correct {
                entry.player.score += 1;
            }
            if is_last {
                entry.player.completed = true;
            }
            (
                entry.player.username.clone(),
                entry.player.score,
                entry.player.completed,
            )
        };

        if correct {
            broadcast::broadcast(
                &self.code,
                &mut state,
                &ServerEvent::Score {
                    username: username.clone(),
                    score,
                },
            );
        }

        let mut all_finished = false;
        if is_last {
            tracing::info!(room_code = %self.code, username = %username, "Player finished game");
            broadcast::broadcast(
                &self.code,
                &mut state,
                &ServerEvent::FinishedGame { username },
            );

            if state.all_completed() {
                all_finished = true;
                broadcast::broadcast(&self.code, &mut state, &ServerEvent::AllPlayersFinished);
            }
        }

        Ok(AnswerOutcome {
            correct,
            score,
            completed,
            all_finished,
        })
    }

    pub async fn all_completed(&self) -> bool {
        self.state.lock().await.all_completed()
    }

    /// Lobby -> CountingDown. Only the first caller wins.
    pub async fn begin_countdown(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.closed || state.phase != GamePhase::Lobby {
            return false;
        }
        state.phase = GamePhase::CountingDown;
        true
    }

    /// CountingDown -> Started, announcing `gameStarted`
    pub async fn mark_started(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.closed || state.phase != GamePhase::CountingDown {
            return false;
        }
        state.phase = GamePhase::Started;
        broadcast::broadcast(&self.code, &mut state, &ServerEvent::GameStarted);
        true
    }

    /// Close the room if nobody is left in it
    pub async fn close_if_empty(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.players.is_empty() {
            state.closed = true;
            return true;
        }
        false
    }

    /// Force-close every connection and stop the game clock
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            state.closed = true;
            broadcast::close_all(&self.code, &mut state);
        }
        self.abort_clock_task();
    }

    pub(crate) fn set_clock_task(&self, handle: JoinHandle<()>) {
        let mut slot = self.clock_task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Forget the clock task without aborting it; used by the task itself
    pub(crate) fn detach_clock_task(&self) {
        let mut slot = self.clock_task.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take();
    }

    pub(crate) fn abort_clock_task(&self) {
        let handle = self
            .clock_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            tracing::debug!(room_code = %self.code, "Stopping game clock");
            handle.abort();
        }
    }

    fn with_code(&self, err: QuizError) -> QuizError {
        match err {
            QuizError::RoomNotFound(_) => QuizError::RoomNotFound(self.code.clone()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{sample_bank, QuestionSource};

    fn room(mode: &str) -> Room {
        let questions = sample_bank(20).generate(10, mode).unwrap();
        Room::new("0042", "host", questions, 5, mode)
    }

    fn connect(
        room_players: &mut Vec<mpsc::UnboundedReceiver<Message>>,
    ) -> PlayerSender {
        let (tx, rx) = mpsc::unbounded_channel();
        room_players.push(rx);
        tx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Ok(text) = message.to_str() {
                out.push(serde_json::from_str(text).unwrap());
            }
        }
        out
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("abc").is_err());
        assert!(validate_username("abcd").is_ok());
        assert!(validate_username(&"x".repeat(20)).is_ok());
        assert!(validate_username(&"x".repeat(21)).is_err());
        // Characters, not bytes
        assert!(validate_username("ñañá").is_ok());
    }

    #[tokio::test]
    async fn test_admit_announces_to_everyone() {
        let room = room("MCQ");
        let mut receivers = Vec::new();

        let alice = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "alice"), alice)
            .await
            .unwrap();
        let bob = connect(&mut receivers);
        room.admit(SessionId(2), Player::new(PlayerId(2), "bobby"), bob)
            .await
            .unwrap();

        let alice_events = drain(&mut receivers[0]);
        assert_eq!(alice_events.len(), 2);
        assert_eq!(alice_events[1]["event"], "playerJoined");
        assert_eq!(alice_events[1]["data"]["username"], "bobby");

        let bob_events = drain(&mut receivers[1]);
        assert_eq!(bob_events.len(), 1, "joiner sees its own playerJoined");
        assert_eq!(bob_events[0]["data"]["id"], 2);
        assert_eq!(bob_events[0]["data"]["score"], 0);
    }

    #[tokio::test]
    async fn test_username_taken_case_insensitive() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "Alice"), tx)
            .await
            .unwrap();
        let tx = connect(&mut receivers);
        room.admit(SessionId(2), Player::new(PlayerId(2), "Bobby"), tx)
            .await
            .unwrap();

        let err = room.check_joinable("aLICE").await.unwrap_err();
        assert!(matches!(err, QuizError::UsernameTaken(_)));

        // Only current members hold their names
        room.remove_player(SessionId(1)).await;
        assert!(room.check_joinable("ALICE").await.is_ok());
    }

    #[tokio::test]
    async fn test_username_taken_folds_unicode() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "ÉMILE"), tx)
            .await
            .unwrap();

        let err = room.check_joinable("émile").await.unwrap_err();
        assert!(matches!(err, QuizError::UsernameTaken(_)));
        assert!(room.check_joinable("emile").await.is_ok());
    }

    #[tokio::test]
    async fn test_room_capacity() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        for i in 0..MAX_PLAYERS_PER_ROOM as u64 {
            let tx = connect(&mut receivers);
            room.admit(SessionId(i), Player::new(PlayerId(i), format!("player{}", i)), tx)
                .await
                .unwrap();
        }

        let tx = connect(&mut receivers);
        let err = room
            .admit(SessionId(99), Player::new(PlayerId(99), "latecomer"), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::RoomFull));
        assert_eq!(room.player_count().await, MAX_PLAYERS_PER_ROOM);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admits_respect_capacity() {
        let room = std::sync::Arc::new(room("MCQ"));

        let joins: Vec<_> = (0..20u64)
            .map(|i| {
                let room = room.clone();
                tokio::spawn(async move {
                    let (tx, rx) = mpsc::unbounded_channel();
                    let result = room
                        .admit(SessionId(i), Player::new(PlayerId(i), format!("racer{:02}", i)), tx)
                        .await;
                    (result, rx)
                })
            })
            .collect();

        let mut admitted = 0;
        let mut refused = 0;
        let mut receivers = Vec::new();
        for join in joins {
            let (result, rx) = join.await.unwrap();
            match result {
                Ok(()) => admitted += 1,
                Err(QuizError::RoomFull) => refused += 1,
                Err(other) => panic!("unexpected admit error: {}", other),
            }
            receivers.push(rx);
        }

        assert_eq!(admitted, MAX_PLAYERS_PER_ROOM);
        assert_eq!(refused, 20 - MAX_PLAYERS_PER_ROOM);
        assert_eq!(room.player_count().await, MAX_PLAYERS_PER_ROOM);
    }

    #[tokio::test]
    async fn test_started_room_refuses_players() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "alice"), tx)
            .await
            .unwrap();

        assert!(room.begin_countdown().await);
        assert!(!room.begin_countdown().await, "countdown starts once");
        assert!(room.mark_started().await);
        assert!(room.is_started().await);

        let tx = connect(&mut receivers);
        let err = room
            .admit(SessionId(2), Player::new(PlayerId(2), "bobby"), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_remove_player_is_idempotent() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "alice"), tx)
            .await
            .unwrap();
        let tx = connect(&mut receivers);
        room.admit(SessionId(2), Player::new(PlayerId(2), "bobby"), tx)
            .await
            .unwrap();
        drain(&mut receivers[0]);

        let removal = room.remove_player(SessionId(2)).await;
        assert_eq!(removal.player.map(|p| p.username), Some("bobby".to_string()));
        assert!(!removal.emptied);

        let left = drain(&mut receivers[0]);
        assert_eq!(left[0]["event"], "playerLeft");
        assert_eq!(left[0]["data"]["id"], 2);

        let again = room.remove_player(SessionId(2)).await;
        assert_eq!(again.player, None);
        assert!(!again.emptied);
        assert!(drain(&mut receivers[0]).is_empty());

        let last = room.remove_player(SessionId(1)).await;
        assert!(last.emptied);
        assert!(room.is_closed().await);
    }

    #[tokio::test]
    async fn test_question_payload_by_mode() {
        let mcq = room("MCQ");
        let payload = mcq.question_payload(0).unwrap();
        assert_eq!(payload.options.as_ref().map(Vec::len), Some(4));
        assert_eq!(payload.flag_url, mcq.question(0).unwrap().flag_url);

        let map = room("MAP");
        let payload = map.question_payload(9).unwrap();
        assert!(payload.options.is_none());

        assert!(mcq.question_payload(-1).is_err());
        assert!(mcq.question_payload(10).is_err());
    }

    #[tokio::test]
    async fn test_record_answer_scores_and_completion() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "alice"), tx)
            .await
            .unwrap();
        drain(&mut receivers[0]);

        let answer = room.question(0).unwrap().answer.clone();
        let outcome = room.record_answer(PlayerId(1), 0, &answer).await.unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.score, 1);

        let events = drain(&mut receivers[0]);
        assert_eq!(events[0]["event"], "answer_result");
        assert_eq!(events[0]["data"]["correct_answer"], answer);
        assert_eq!(events[0]["data"]["chosen_answer"], answer);
        assert_eq!(events[1]["event"], "score");
        assert_eq!(events[1]["data"]["score"], 1);

        let outcome = room.record_answer(PlayerId(1), 9, "nowhere").await.unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.score, 1);
        assert!(outcome.completed);
        assert!(outcome.all_finished);

        let names: Vec<_> = drain(&mut receivers[0])
            .iter()
            .map(|e| e["event"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["answer_result", "finished_game", "all_players_finished"]);
    }

    #[tokio::test]
    async fn test_record_answer_rejects_bad_index() {
        let room = room("MCQ");
        let err = room.record_answer(PlayerId(1), 10, "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid question index");
        let err = room.record_answer(PlayerId(1), -1, "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid question index");
    }

    #[tokio::test]
    async fn test_close_sends_close_frames() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(1), "alice"), tx)
            .await
            .unwrap();
        drain(&mut receivers[0]);

        room.close().await;
        assert!(room.is_closed().await);
        assert_eq!(room.player_count().await, 0);

        let message = receivers[0].try_recv().unwrap();
        assert!(message.is_close());
        assert!(receivers[0].try_recv().is_err());
    }

    #[test]
    fn test_debug_names_room() {
        let rendered = format!("{:?}", room("MAP"));
        assert!(rendered.contains("\"0042\""));
        assert!(rendered.contains("MAP"));
        assert!(rendered.contains("questions: 10"));
    }

    #[tokio::test]
    async fn test_summary_shape() {
        let room = room("MCQ");
        let mut receivers = Vec::new();
        let tx = connect(&mut receivers);
        room.admit(SessionId(1), Player::new(PlayerId(7), "alice"), tx)
            .await
            .unwrap();

        let value = serde_json::to_value(room.summary().await).unwrap();
        assert_eq!(value["code"], "0042");
        assert_eq!(value["host"], "host");
        assert_eq!(value["timeLimit"], 5);
        assert_eq!(value["numQuestions"], 10);
        assert_eq!(value["gamemode"], "MCQ");
        assert_eq!(value["start"], false);
        assert_eq!(value["players"][0]["id"], 7);
        assert_eq!(value["players"][0]["username"], "alice");
    }
}
