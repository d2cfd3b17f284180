use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::events::ServerEvent;
use super::registry::RoomRegistry;
use super::room::Room;

/// First value of the pre-game countdown; steps run down to zero
pub const COUNTDOWN_FROM: u8 = 3;

/// Timing for the pre-game countdown and the round time limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    /// Pause after each countdown step
    pub countdown_step: Duration,
    /// Length of one time-limit minute
    pub minute: Duration,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            countdown_step: Duration::from_secs(1),
            minute: Duration::from_secs(60),
        }
    }
}

impl GameClock {
    pub fn time_limit(&self, minutes: u32) -> Duration {
        self.minute * minutes
    }
}

/// Start the game in `room` if it is still in the lobby.
///
/// The countdown, the start announcement and the end-of-round timer run on
/// one task owned by the room, so the caller's event loop stays responsive.
/// Returns false when the room was already loading or started.
pub async fn load_game(registry: &Arc<RoomRegistry>, room: &Arc<Room>) -> bool {
    if !room.begin_countdown().await {
        tracing::debug!(room_code = %room.code(), "Ignoring repeated loadgame");
        return false;
    }

    tracing::info!(room_code = %room.code(), "Starting game countdown");
    let handle = tokio::spawn(run_game_clock(
        registry.clone(),
        room.clone(),
        registry.clock(),
    ));
    room.set_clock_task(handle);
    true
}

async fn run_game_clock(registry: Arc<RoomRegistry>, room: Arc<Room>, clock: GameClock) {
    for step in (0..=COUNTDOWN_FROM).rev() {
        room.broadcast(&ServerEvent::Countdown(step)).await;
        sleep(clock.countdown_step).await;
    }

    if !room.mark_started().await {
        tracing::debug!(room_code = %room.code(), "Room closed during countdown");
        return;
    }
    tracing::info!(
        room_code = %room.code(),
        time_limit_minutes = room.time_limit_minutes(),
        "Game started"
    );

    // Finishing early does not stop the clock
    sleep(clock.time_limit(room.time_limit_minutes())).await;

    tracing::info!(room_code = %room.code(), "Time over, closing room");
    room.broadcast(&ServerEvent::TimeOver).await;
    room.detach_clock_task();
    registry.remove_room(&room).await;
}
