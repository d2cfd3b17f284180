//! Delivery of events to the connections registered in a room.
//!
//! Every function here runs with the room lock held, so iteration and
//! eviction never interleave with joins or leaves on the same room.
//! A connection that fails to receive is dropped from the player set and
//! the remaining players get a `playerLeft` for it.

use std::collections::VecDeque;

use warp::ws::Message;

use super::events::ServerEvent;
use super::room::{Player, PlayerId, RoomState, SessionId};
use crate::error::{QuizError, Result};

/// Send `event` to every player. Returns the players evicted on the way.
pub(crate) fn broadcast(room_code: &str, state: &mut RoomState, event: &ServerEvent) -> Vec<Player> {
    let mut evicted = Vec::new();
    let mut pending = VecDeque::from([event.clone()]);

    while let Some(event) = pending.pop_front() {
        let message = match event.to_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    room_code = %room_code,
                    event = event.name(),
                    error = %e,
                    "Failed to encode broadcast"
                );
                continue;
            }
        };

        let failed: Vec<SessionId> = state
            .players
            .iter()
            .filter_map(|(session, entry)| {
                entry.sender.send(message.clone()).err().map(|_| *session)
            })
            .collect();

        for session in failed {
            if let Some(player) = evict(room_code, state, session) {
                pending.push_back(ServerEvent::PlayerLeft {
                    username: player.username.clone(),
                    id: player.id,
                });
                evicted.push(player);
            }
        }
    }

    evicted
}

/// Unicast by player id. A failed delivery evicts the connection and is
/// reported to the caller.
pub(crate) fn send_to_player(
    room_code: &str,
    state: &mut RoomState,
    player_id: PlayerId,
    message: Message,
) -> Result<()> {
    let (session, entry) = state
        .players
        .iter()
        .find(|(_, entry)| entry.player.id == player_id)
        .ok_or_else(|| QuizError::PlayerNotFound(player_id.to_string()))?;
    let session = *session;

    if entry.sender.send(message).is_ok() {
        return Ok(());
    }

    if let Some(player) = evict(room_code, state, session) {
        broadcast(
            room_code,
            state,
            &ServerEvent::PlayerLeft {
                username: player.username,
                id: player.id,
            },
        );
    }
    Err(QuizError::DeliveryFailed(player_id.to_string()))
}

/// Ask every connection to close and empty the player set
pub(crate) fn close_all(room_code: &str, state: &mut RoomState) {
    for (_, entry) in state.players.drain() {
        if entry.sender.send(Message::close()).is_err() {
            tracing::debug!(
                room_code = %room_code,
                player_id = %entry.player.id,
                "Connection already gone while closing room"
            );
        }
    }
}

fn evict(room_code: &str, state: &mut RoomState, session: SessionId) -> Option<Player> {
    let entry = state.players.remove(&session)?;
    tracing::warn!(
        room_code = %room_code,
        player_id = %entry.player.id,
        username = %entry.player.username,
        "Delivery failed, evicting connection"
    );
    Some(entry.player)
}
