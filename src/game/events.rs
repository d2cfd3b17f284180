use serde::{Deserialize, Serialize};
use serde_json::Value;
use warp::ws::Message;

use super::room::PlayerId;
use crate::error::{QuizError, Result};

/// First message a client sends after the WebSocket upgrade
#[derive(Debug, Clone, Deserialize)]
pub struct Handshake {
    pub username: String,
    #[serde(rename = "roomID", alias = "roomCode")]
    pub room_code: String,
}

/// Envelope for every message after the handshake
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Leave,
    LoadGame,
    GetNewQuestion { question_number: i64 },
    ValidateAnswer { question_index: i64, answer: String },
    CleanRoom,
    Unknown(String),
}

impl ClientEvent {
    /// Decode an envelope. Errors carry the message reported back to the sender.
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        match envelope.event.as_str() {
            "leave" => Ok(ClientEvent::Leave),
            "loadgame" => Ok(ClientEvent::LoadGame),
            "clean_room" => Ok(ClientEvent::CleanRoom),
            "get_new_question" => {
                let data = envelope
                    .data
                    .as_object()
                    .ok_or_else(|| QuizError::validation("Invalid data format"))?;
                let question_number = data
                    .get("question_number")
                    .and_then(integer)
                    .ok_or_else(|| QuizError::validation("Invalid question number"))?;
                Ok(ClientEvent::GetNewQuestion { question_number })
            }
            "validate_answer" => {
                let data = envelope
                    .data
                    .as_object()
                    .ok_or_else(|| QuizError::validation("Invalid data format"))?;
                let question_index = data
                    .get("question_index")
                    .and_then(integer)
                    .ok_or_else(|| QuizError::validation("Invalid question index"))?;
                let answer = data
                    .get("answer")
                    .and_then(Value::as_str)
                    .ok_or_else(|| QuizError::validation("Invalid answer"))?;
                Ok(ClientEvent::ValidateAnswer {
                    question_index,
                    answer: answer.to_string(),
                })
            }
            other => Ok(ClientEvent::Unknown(other.to_string())),
        }
    }
}

/// JSON numbers arrive as floats from browsers; accept whole values only
fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Question as shown to players; the answer is never included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub flag_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "playerJoined")]
    PlayerJoined {
        username: String,
        score: u32,
        id: PlayerId,
    },

    #[serde(rename = "playerLeft")]
    PlayerLeft { username: String, id: PlayerId },

    #[serde(rename = "countdown")]
    Countdown(u8),

    #[serde(rename = "gameStarted")]
    GameStarted,

    #[serde(rename = "time_over")]
    TimeOver,

    #[serde(rename = "new_question")]
    NewQuestion(QuestionPayload),

    #[serde(rename = "answer_result")]
    AnswerResult {
        correct_answer: String,
        chosen_answer: String,
    },

    #[serde(rename = "score")]
    Score { username: String, score: u32 },

    #[serde(rename = "finished_game")]
    FinishedGame { username: String },

    #[serde(rename = "all_players_finished")]
    AllPlayersFinished,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::PlayerJoined { .. } => "playerJoined",
            ServerEvent::PlayerLeft { .. } => "playerLeft",
            ServerEvent::Countdown(_) => "countdown",
            ServerEvent::GameStarted => "gameStarted",
            ServerEvent::TimeOver => "time_over",
            ServerEvent::NewQuestion(_) => "new_question",
            ServerEvent::AnswerResult { .. } => "answer_result",
            ServerEvent::Score { .. } => "score",
            ServerEvent::FinishedGame { .. } => "finished_game",
            ServerEvent::AllPlayersFinished => "all_players_finished",
        }
    }

    /// Wire form of the event. `finished_game` also carries `username` at the
    /// top level, where browser clients read it.
    pub fn to_value(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let (ServerEvent::FinishedGame { username }, Value::Object(fields)) = (self, &mut value) {
            fields.insert("username".to_string(), Value::String(username.clone()));
        }
        Ok(value)
    }

    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::text(self.to_value()?.to_string()))
    }
}

/// Generic protocol error shape: `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::text(serde_json::to_string(self)?))
    }
}
